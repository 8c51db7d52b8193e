//! Task Poller / Dispatcher and the auto-execute orchestrator.
//!
//! Within one dispatch call tasks for a single worker run strictly in
//! position order and never overlap; two tasks for the same specialist
//! racing on shared external state is exactly what this avoids. Across
//! workers, dispatch calls fan out concurrently with no ordering guarantee.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::core::store::{ProjectStore, WorkflowTaskRecord};
use crate::core::workflow::executor::{TaskExecutor, TaskRunResult};
use crate::core::workflow::translator::{self, TranslatedWorkflow};
use crate::core::workflow::{Delegation, Worker};

pub const DEFAULT_BATCH_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub worker: Worker,
    pub triggered: bool,
    pub tasks_processed: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoExecuteReport {
    pub workflow_id: String,
    pub tasks_created: usize,
    pub workers: Vec<DispatchReport>,
}

pub struct TaskDispatcher {
    store: Arc<ProjectStore>,
    executor: Arc<TaskExecutor>,
}

impl TaskDispatcher {
    pub fn new(store: Arc<ProjectStore>, executor: Arc<TaskExecutor>) -> Self {
        Self { store, executor }
    }

    /// Pending tasks for one worker across all active workflows, position
    /// order, capped at `limit`.
    pub async fn poll_pending(
        &self,
        worker: Worker,
        limit: usize,
    ) -> Result<Vec<WorkflowTaskRecord>> {
        self.store
            .list_pending_tasks_for_worker(worker.as_str(), limit)
            .await
    }

    /// Poll and execute up to `limit` tasks for `worker`, sequentially.
    ///
    /// Failed tasks are reported, not retried. Retrying is an explicit
    /// caller action, usually another dispatch call.
    pub async fn dispatch(&self, worker: Worker, limit: usize) -> Result<Vec<TaskRunResult>> {
        let tasks = self.poll_pending(worker, limit).await?;
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            "Dispatching {} task(s) to {} worker",
            tasks.len(),
            worker.as_str()
        );

        let mut results = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let result = self.executor.execute(task).await?;
            results.push(result);
        }
        Ok(results)
    }

    /// Auto-execute: translate the delegations once, then trigger one
    /// dispatch per distinct worker concurrently.
    ///
    /// The fan-out is gathered on a JoinSet rather than detached, so callers
    /// (and tests) can await it deterministically. A dispatch that errors is
    /// recorded as `triggered = false` for that worker; the workflow and its
    /// tasks are already persisted and remain dispatchable later.
    pub async fn auto_execute(
        self: &Arc<Self>,
        owner_id: &str,
        project_id: Option<&str>,
        name: &str,
        summary: Option<&str>,
        delegations: &[Delegation],
    ) -> Result<AutoExecuteReport> {
        let TranslatedWorkflow { workflow, tasks } = translator::create_workflow_from_delegations(
            &self.store,
            owner_id,
            project_id,
            name,
            summary,
            delegations,
        )
        .await?;

        let mut distinct: Vec<Worker> = Vec::new();
        for task in &tasks {
            if let Some(worker) = Worker::from_name(&task.worker)
                && !distinct.contains(&worker)
            {
                distinct.push(worker);
            }
        }

        let mut set = JoinSet::new();
        for worker in distinct.clone() {
            let dispatcher = Arc::clone(self);
            set.spawn(async move {
                match dispatcher.dispatch(worker, DEFAULT_BATCH_LIMIT).await {
                    Ok(results) => DispatchReport {
                        worker,
                        triggered: true,
                        tasks_processed: results.len(),
                        error: None,
                    },
                    Err(e) => {
                        warn!(
                            "Dispatch trigger for {} worker failed: {}",
                            worker.as_str(),
                            e
                        );
                        DispatchReport {
                            worker,
                            triggered: false,
                            tasks_processed: 0,
                            error: Some(e.to_string()),
                        }
                    }
                }
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => warn!("Dispatch task join error: {}", e),
            }
        }
        // Present reports in the workers' first-appearance order.
        reports.sort_by_key(|r| distinct.iter().position(|w| *w == r.worker));

        Ok(AutoExecuteReport {
            workflow_id: workflow.id,
            tasks_created: tasks.len(),
            workers: reports,
        })
    }
}
