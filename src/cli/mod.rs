//! Daemon entrypoint: wire the store, collaborators, and engine components
//! together and serve the API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::core::config::EngineConfig;
use crate::core::scheduler::DispatchScheduler;
use crate::core::storage::{HttpBucketStorage, LocalDirStorage, ObjectStorage};
use crate::core::store::ProjectStore;
use crate::core::video::VideoJobManager;
use crate::core::video::clips::{BatchClipGenerator, RouterClipRenderer};
use crate::core::video::providers::{PikaProvider, ProviderRouter, RunwayProvider, VideoProvider};
use crate::core::worker::{HttpWorker, WorkerRegistry};
use crate::core::workflow::Worker;
use crate::core::workflow::dispatcher::TaskDispatcher;
use crate::core::workflow::executor::TaskExecutor;
use crate::interfaces::web::{ApiServer, AppState};
use crate::logging;

const USAGE: &str = "Usage: backlot [serve] [--port PORT] [--data-dir PATH]";

pub async fn run_main() -> Result<()> {
    logging::init();

    let mut config = EngineConfig::from_env();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "serve" => {}
            "--port" => {
                if let Some(port) = args.next().and_then(|v| v.parse().ok()) {
                    config.api_port = port;
                }
            }
            "--data-dir" => {
                if let Some(dir) = args.next() {
                    config.data_dir = PathBuf::from(dir);
                }
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            other => {
                anyhow::bail!("unknown argument '{other}'\n{USAGE}");
            }
        }
    }

    serve(config).await
}

async fn serve(config: EngineConfig) -> Result<()> {
    let store = Arc::new(ProjectStore::open(&config.data_dir).await?);

    let providers: Vec<Arc<dyn VideoProvider>> = vec![
        Arc::new(PikaProvider::from_env()),
        Arc::new(RunwayProvider::from_env()),
    ];
    let router = Arc::new(ProviderRouter::new(
        providers,
        &config.video_provider_priority,
    ));

    let storage: Arc<dyn ObjectStorage> = match HttpBucketStorage::from_env() {
        Some(bucket) => Arc::new(bucket),
        None => Arc::new(LocalDirStorage::new(config.data_dir.join("objects"))),
    };

    let workers = Arc::new(build_worker_registry());
    info!(
        "{} of {} specialist routines registered",
        workers.registered().len(),
        Worker::ALL.len()
    );
    let executor = Arc::new(TaskExecutor::new(store.clone(), workers.clone()));
    let dispatcher = Arc::new(TaskDispatcher::new(store.clone(), executor));

    let video = Arc::new(VideoJobManager::new(
        store.clone(),
        router.clone(),
        storage,
        config.clone(),
    ));
    let renderer = Arc::new(RouterClipRenderer::new(
        router,
        Duration::from_secs(5),
        60,
    ));
    let clips = Arc::new(BatchClipGenerator::new(store.clone(), renderer));

    let _heartbeat = match &config.dispatch_cron {
        Some(cron) => Some(DispatchScheduler::start(dispatcher.clone(), cron).await?),
        None => None,
    };

    let state = AppState {
        store,
        dispatcher,
        video,
        clips,
        config,
    };
    ApiServer::new(state).serve().await
}

/// Each specialist runs as its own HTTP service; a worker with no configured
/// service URL simply has no routine, and its tasks fail with a recorded
/// error instead of sitting claimed forever.
fn build_worker_registry() -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    for worker in Worker::ALL {
        let var = format!("BACKLOT_{}_WORKER_URL", worker.as_str().to_uppercase());
        match std::env::var(&var) {
            Ok(url) if !url.trim().is_empty() => {
                info!("Registered {} worker at {}", worker.as_str(), url);
                registry.register(worker, Arc::new(HttpWorker::new(url)));
            }
            _ => {
                warn!(
                    "No service configured for {} worker ({} unset)",
                    worker.as_str(),
                    var
                );
            }
        }
    }
    registry
}
