//! Shared scripted collaborators for engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::core::storage::ObjectStorage;
use crate::core::store::ProjectStore;
use crate::core::video::clips::{ClipRenderer, RenderedClip, ShotSpec};
use crate::core::video::providers::{ProviderKind, ProviderPoll, RenderSpec, VideoProvider};
use crate::core::worker::{TaskContext, WorkerRoutine};

pub async fn open_temp_store() -> (tempfile::TempDir, Arc<ProjectStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProjectStore::open(dir.path()).await.expect("open store");
    (dir, Arc::new(store))
}

/// Serve a small fake artifact over local HTTP so the manager's download
/// step has something real to fetch.
pub async fn spawn_artifact_server() -> (String, tokio::task::JoinHandle<()>) {
    use axum::{Router, routing::get};

    let app = Router::new().route(
        "/artifact.mp4",
        get(|| async { Bytes::from_static(b"not-really-an-mp4") }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind artifact server");
    let addr = listener.local_addr().expect("artifact server addr");
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/artifact.mp4"), handle)
}

/// Worker routine that succeeds with a fixed payload, optionally failing for
/// tasks whose title contains `fail_when`. Counts invocations.
pub struct ScriptedWorker {
    pub fail_when: Option<String>,
    pub calls: AtomicUsize,
}

impl ScriptedWorker {
    pub fn succeeding() -> Self {
        Self {
            fail_when: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_when: Some(marker.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerRoutine for ScriptedWorker {
    async fn execute(&self, ctx: &TaskContext) -> Result<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_when
            && ctx.title.contains(marker.as_str())
        {
            return Err(anyhow!("scripted failure for '{}'", ctx.title));
        }
        Ok(serde_json::json!({ "echo": ctx.title, "action": ctx.action }))
    }
}

/// One scripted poll response. `Transport` models "could not reach the
/// provider" rather than a provider-reported state.
#[derive(Clone)]
pub enum PollStep {
    Running,
    Succeeded(String),
    Failed(String),
    Transport,
}

pub struct MockProvider {
    kind: ProviderKind,
    configured: bool,
    accept: bool,
    pub create_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    poll_script: Mutex<VecDeque<PollStep>>,
}

impl MockProvider {
    pub fn accepting(kind: ProviderKind) -> Self {
        Self {
            kind,
            configured: true,
            accept: true,
            create_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            poll_script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn rejecting(kind: ProviderKind) -> Self {
        Self {
            accept: false,
            ..Self::accepting(kind)
        }
    }

    pub fn unconfigured(kind: ProviderKind) -> Self {
        Self {
            configured: false,
            ..Self::accepting(kind)
        }
    }

    pub async fn script_polls(&self, steps: Vec<PollStep>) {
        let mut script = self.poll_script.lock().await;
        script.clear();
        script.extend(steps);
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn create(&self, _spec: &RenderSpec) -> Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.accept {
            Ok(format!("{}-job-1", self.kind.as_str()))
        } else {
            Err(anyhow!("provider rejected the render"))
        }
    }

    async fn poll(&self, _provider_job_id: &str) -> Result<ProviderPoll> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.poll_script.lock().await.pop_front();
        match step {
            Some(PollStep::Running) | None => Ok(ProviderPoll::Running),
            Some(PollStep::Succeeded(url)) => Ok(ProviderPoll::Succeeded { artifact_url: url }),
            Some(PollStep::Failed(error)) => Ok(ProviderPoll::Failed { error }),
            Some(PollStep::Transport) => Err(anyhow!("connection reset by peer")),
        }
    }
}

/// In-memory object storage that counts uploads per path.
#[derive(Default)]
pub struct MemoryStorage {
    pub uploads: Mutex<HashMap<String, usize>>,
    pub upload_calls: AtomicUsize,
    pub fail_uploads: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, _bytes: Bytes, path: &str, _content_type: &str) -> Result<String> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads {
            return Err(anyhow!("bucket unavailable"));
        }
        *self
            .uploads
            .lock()
            .await
            .entry(path.to_string())
            .or_insert(0) += 1;
        Ok(path.to_string())
    }

    async fn url_for(&self, path: &str) -> Result<String> {
        Ok(format!("mem://{path}"))
    }
}

/// Renderer that fails configured shot numbers and tracks per-shot call
/// counts plus the concurrency high-water mark.
pub struct ScriptedRenderer {
    fail_shots: Vec<i64>,
    pub calls_by_shot: Mutex<HashMap<i64, usize>>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl ScriptedRenderer {
    pub fn new(fail_shots: Vec<i64>) -> Self {
        Self {
            fail_shots,
            calls_by_shot: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub async fn calls_for(&self, shot_number: i64) -> usize {
        *self
            .calls_by_shot
            .lock()
            .await
            .get(&shot_number)
            .unwrap_or(&0)
    }
}

#[async_trait]
impl ClipRenderer for ScriptedRenderer {
    async fn render(&self, shot: &ShotSpec) -> Result<RenderedClip> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        *self
            .calls_by_shot
            .lock()
            .await
            .entry(shot.shot_number)
            .or_insert(0) += 1;

        // Yield so the rest of the batch gets to start before we finish.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_shots.contains(&shot.shot_number) {
            return Err(anyhow!("render failed for shot {}", shot.shot_number));
        }
        Ok(RenderedClip {
            video_url: format!("https://cdn.example/clips/{}.mp4", shot.shot_number),
            duration_sec: shot.duration_sec,
        })
    }
}
