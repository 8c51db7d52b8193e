mod handlers;
mod router;


use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::core::config::EngineConfig;
use crate::core::store::ProjectStore;
use crate::core::video::VideoJobManager;
use crate::core::video::clips::BatchClipGenerator;
use crate::core::workflow::dispatcher::TaskDispatcher;

pub use router::build_api_router;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProjectStore>,
    pub dispatcher: Arc<TaskDispatcher>,
    pub video: Arc<VideoJobManager>,
    pub clips: Arc<BatchClipGenerator>,
    pub config: EngineConfig,
}

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn serve(self) -> Result<()> {
        let addr = format!(
            "{}:{}",
            self.state.config.api_host, self.state.config.api_port
        );
        let app = router::build_api_router(self.state);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("backlot API listening on {}", addr);
        axum::serve(listener, app).await?;
        Ok(())
    }
}
