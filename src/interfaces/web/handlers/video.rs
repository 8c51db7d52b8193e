use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::core::video::{AnimateRequest, CreateJobOutcome};
use crate::interfaces::web::AppState;

#[derive(serde::Deserialize)]
pub struct AnimatePayload {
    pub owner_id: String,
    #[serde(flatten)]
    pub request: AnimateRequest,
}

#[derive(serde::Deserialize)]
pub struct OwnerQuery {
    pub owner_id: String,
}

pub async fn animate(
    State(state): State<AppState>,
    Json(payload): Json<AnimatePayload>,
) -> Json<serde_json::Value> {
    if payload.owner_id.trim().is_empty() {
        return Json(serde_json::json!({ "success": false, "error": "owner_id is required" }));
    }

    match state.video.create_job(&payload.owner_id, &payload.request).await {
        Ok(CreateJobOutcome::Created { job }) => {
            let failed = job.status == "failed";
            Json(serde_json::json!({
                "success": !failed,
                "job": job,
            }))
        }
        Ok(CreateJobOutcome::Duplicate { job }) => Json(serde_json::json!({
            "success": true,
            "duplicate": true,
            "job": job,
        })),
        Ok(CreateJobOutcome::QuotaExceeded { used, limit }) => Json(serde_json::json!({
            "success": false,
            "error": "daily render quota exceeded",
            "quota": { "used": used, "limit": limit },
        })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

/// Job read model. Polling a running job advances it when the provider has
/// finished; polling a terminal job just returns the stored row.
pub async fn get_job(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Json<serde_json::Value> {
    match state.video.poll_job(&query.owner_id, &id).await {
        Ok(Some(job)) => {
            let playback_url = state.video.playback_url(&job).await;
            Json(serde_json::json!({
                "success": true,
                "job": job,
                "playback_url": playback_url,
            }))
        }
        Ok(None) => Json(serde_json::json!({ "success": false, "error": "Job not found" })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}
