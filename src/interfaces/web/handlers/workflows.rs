use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::core::workflow::Delegation;
use crate::interfaces::web::AppState;

#[derive(serde::Deserialize)]
pub struct ListQuery {
    pub owner_id: String,
    pub project_id: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct AutoExecuteRequest {
    pub owner_id: String,
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub delegations: Vec<Delegation>,
}

pub async fn list_workflows(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<serde_json::Value> {
    match state
        .store
        .list_workflows_by_owner(&query.owner_id, query.project_id.as_deref())
        .await
    {
        Ok(workflows) => {
            let count = workflows.len();
            Json(serde_json::json!({
                "success": true,
                "workflows": workflows,
                "count": count
            }))
        }
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

pub async fn get_workflow(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Json<serde_json::Value> {
    let workflow = match state.store.get_workflow(&id).await {
        Ok(Some(workflow)) => workflow,
        Ok(None) => {
            return Json(serde_json::json!({ "success": false, "error": "Workflow not found" }));
        }
        Err(e) => return Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    };

    match state.store.list_tasks(&id).await {
        Ok(tasks) => Json(serde_json::json!({
            "success": true,
            "workflow": workflow,
            "tasks": tasks
        })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

/// Create the workflow from the planner's delegations and trigger dispatch
/// for every worker involved, concurrently. The response carries the
/// persisted workflow id plus per-worker trigger flags; a worker whose
/// trigger failed leaves its tasks pending and dispatchable later.
pub async fn auto_execute_workflow(
    State(state): State<AppState>,
    Json(payload): Json<AutoExecuteRequest>,
) -> Json<serde_json::Value> {
    if payload.owner_id.trim().is_empty() {
        return Json(serde_json::json!({ "success": false, "error": "owner_id is required" }));
    }
    if payload.delegations.is_empty() {
        return Json(
            serde_json::json!({ "success": false, "error": "delegations must not be empty" }),
        );
    }

    let name = payload
        .name
        .clone()
        .unwrap_or_else(|| "Auto-executed workflow".to_string());

    match state
        .dispatcher
        .auto_execute(
            &payload.owner_id,
            payload.project_id.as_deref(),
            &name,
            payload.summary.as_deref(),
            &payload.delegations,
        )
        .await
    {
        Ok(report) => Json(serde_json::json!({
            "success": true,
            "workflow_id": report.workflow_id,
            "tasks_created": report.tasks_created,
            "workers": report.workers,
        })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}
