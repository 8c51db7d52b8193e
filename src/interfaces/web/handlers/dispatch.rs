use axum::{Json, extract::State};

use crate::core::workflow::Worker;
use crate::core::workflow::dispatcher::DEFAULT_BATCH_LIMIT;
use crate::interfaces::web::AppState;

#[derive(serde::Deserialize)]
pub struct PollRequest {
    pub worker: String,
    pub max_tasks: Option<usize>,
    /// false = just report what is pending, don't execute.
    pub auto_execute: Option<bool>,
}

/// Trigger one dispatch pass for a worker: poll its pending tasks across all
/// active workflows and execute them sequentially.
pub async fn poll_worker(
    State(state): State<AppState>,
    Json(payload): Json<PollRequest>,
) -> Json<serde_json::Value> {
    let Some(worker) = Worker::from_name(&payload.worker) else {
        let valid: Vec<&str> = Worker::ALL.iter().map(|w| w.as_str()).collect();
        return Json(serde_json::json!({
            "success": false,
            "error": format!("invalid worker '{}'; must be one of: {}", payload.worker, valid.join(", "))
        }));
    };

    let limit = payload.max_tasks.unwrap_or(DEFAULT_BATCH_LIMIT);

    if !payload.auto_execute.unwrap_or(true) {
        return match state.dispatcher.poll_pending(worker, limit).await {
            Ok(tasks) => Json(serde_json::json!({
                "success": true,
                "worker": worker,
                "tasks_found": tasks.len(),
                "tasks": tasks,
            })),
            Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        };
    }

    match state.dispatcher.dispatch(worker, limit).await {
        Ok(results) => Json(serde_json::json!({
            "success": true,
            "worker": worker,
            "tasks_processed": results.len(),
            "results": results,
        })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}
