use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::handlers::{clips, dispatch, video, workflows};

fn build_localhost_cors(api_port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", api_port),
        format!("http://localhost:{}", api_port),
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

pub fn build_api_router(state: AppState) -> Router {
    let cors = build_localhost_cors(state.config.api_port);

    Router::new()
        .route("/api/workflows", get(workflows::list_workflows))
        .route("/api/workflows/{id}", get(workflows::get_workflow))
        .route(
            "/api/workflows/auto-execute",
            post(workflows::auto_execute_workflow),
        )
        .route("/api/workers/poll", post(dispatch::poll_worker))
        .route("/api/video/animate", post(video::animate))
        .route("/api/video/jobs/{id}", get(video::get_job))
        .route(
            "/api/shot-lists/{id}/clips",
            get(clips::list_clips).post(clips::generate_clips),
        )
        .route(
            "/api/shot-lists/{id}/clips/retry",
            post(clips::retry_failed_clips),
        )
        .layer(cors)
        .with_state(state)
}
