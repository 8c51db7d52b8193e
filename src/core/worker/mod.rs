//! Specialist worker collaborators.
//!
//! A worker routine is the engine's opaque "do the creative work" seam: it
//! gets one claimed task's context and either returns a result payload or
//! errors. The registry is a closed map over the fixed [`Worker`] identities
//! with no open-ended plugin loading.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::workflow::Worker;

/// Everything a routine gets to see about the task it was claimed for.
#[derive(Debug, Clone, Serialize)]
pub struct TaskContext {
    pub task_id: String,
    pub workflow_id: String,
    pub title: String,
    pub description: String,
    pub worker: Worker,
    pub action: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait WorkerRoutine: Send + Sync {
    /// Run the task once. The executor guarantees at most one invocation per
    /// claimed task.
    async fn execute(&self, ctx: &TaskContext) -> Result<serde_json::Value>;
}

#[derive(Default)]
pub struct WorkerRegistry {
    routines: HashMap<Worker, Arc<dyn WorkerRoutine>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routine(mut self, worker: Worker, routine: Arc<dyn WorkerRoutine>) -> Self {
        self.routines.insert(worker, routine);
        self
    }

    pub fn register(&mut self, worker: Worker, routine: Arc<dyn WorkerRoutine>) {
        self.routines.insert(worker, routine);
    }

    pub fn get(&self, worker: Worker) -> Option<Arc<dyn WorkerRoutine>> {
        self.routines.get(&worker).cloned()
    }

    pub fn registered(&self) -> Vec<Worker> {
        Worker::ALL
            .into_iter()
            .filter(|w| self.routines.contains_key(w))
            .collect()
    }
}

#[derive(Deserialize)]
struct WorkerEnvelope {
    success: bool,
    #[serde(default)]
    results: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Routine backed by a specialist HTTP service. Each specialist runs as its
/// own service; this client posts the task context to its `/tasks` endpoint
/// and unwraps the usual `{ success, results, error }` envelope.
pub struct HttpWorker {
    base_url: String,
    client: Client,
}

impl HttpWorker {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl WorkerRoutine for HttpWorker {
    async fn execute(&self, ctx: &TaskContext) -> Result<serde_json::Value> {
        let res = self
            .client
            .post(format!("{}/tasks", self.base_url))
            .json(ctx)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "Worker service error ({}): {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }
        let envelope: WorkerEnvelope = res.json().await?;
        if envelope.success {
            Ok(envelope.results.unwrap_or(serde_json::Value::Null))
        } else {
            Err(anyhow!(
                envelope
                    .error
                    .unwrap_or_else(|| "worker reported failure without detail".to_string())
            ))
        }
    }
}
