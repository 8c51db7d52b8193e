use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::video::clips::ShotSpec;
use crate::interfaces::web::AppState;

#[derive(serde::Deserialize)]
pub struct GenerateClipsRequest {
    pub project_id: String,
    pub provider: Option<String>,
    pub shots: Vec<ShotSpec>,
}

#[derive(serde::Deserialize)]
pub struct RetryClipsRequest {
    pub shots: Vec<ShotSpec>,
}

pub async fn list_clips(
    Path(shot_list_id): Path<String>,
    State(state): State<AppState>,
) -> Json<serde_json::Value> {
    match state.store.list_clips_by_shot_list(&shot_list_id).await {
        Ok(clips) => {
            let count = clips.len();
            Json(serde_json::json!({
                "success": true,
                "clips": clips,
                "count": count
            }))
        }
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

pub async fn generate_clips(
    Path(shot_list_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<GenerateClipsRequest>,
) -> Json<serde_json::Value> {
    if payload.shots.is_empty() {
        return Json(serde_json::json!({ "success": false, "error": "shots must not be empty" }));
    }
    let provider = payload.provider.as_deref().unwrap_or("pika");

    match state
        .clips
        .generate(&shot_list_id, &payload.project_id, provider, &payload.shots)
        .await
    {
        Ok(outcomes) => {
            let failed = outcomes.iter().filter(|o| !o.success).count();
            Json(serde_json::json!({
                "success": failed == 0,
                "clips": outcomes,
                "failed": failed,
            }))
        }
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

/// Re-render only the clips currently in a failed state; succeeded clips are
/// left untouched.
pub async fn retry_failed_clips(
    Path(shot_list_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<RetryClipsRequest>,
) -> Json<serde_json::Value> {
    match state.clips.retry_failed(&shot_list_id, &payload.shots).await {
        Ok(outcomes) => {
            let failed = outcomes.iter().filter(|o| !o.success).count();
            Json(serde_json::json!({
                "success": failed == 0,
                "retried": outcomes.len(),
                "clips": outcomes,
            }))
        }
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}
