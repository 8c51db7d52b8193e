//! Task Executor: claims one task, runs the worker routine, persists the
//! outcome, and keeps the parent workflow's completion counter honest.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::core::store::{ProjectStore, WorkflowTaskRecord};
use crate::core::worker::{TaskContext, WorkerRegistry};
use crate::core::workflow::{TaskStatus, Worker, WorkflowStatus, task_can_transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionDisposition {
    Completed,
    Failed,
    /// The task was not `pending` when we tried to claim it: either another
    /// poller got there first or it is already terminal. Nothing ran.
    NotClaimable,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRunResult {
    pub task_id: String,
    pub disposition: ExecutionDisposition,
    pub error: Option<String>,
    pub results: Option<serde_json::Value>,
}

impl TaskRunResult {
    pub fn succeeded(&self) -> bool {
        self.disposition == ExecutionDisposition::Completed
    }
}

pub struct TaskExecutor {
    store: Arc<ProjectStore>,
    workers: Arc<WorkerRegistry>,
}

impl TaskExecutor {
    pub fn new(store: Arc<ProjectStore>, workers: Arc<WorkerRegistry>) -> Self {
        Self { store, workers }
    }

    /// Execute one task end to end.
    ///
    /// The claim (`pending → in_progress`) is a conditional write, so of two
    /// concurrent invocations exactly one runs the routine and the loser sees
    /// `NotClaimable`. Re-invocation on an already-terminal task is a no-op
    /// for the same reason: the routine is never re-run.
    pub async fn execute(&self, task: &WorkflowTaskRecord) -> Result<TaskRunResult> {
        // Fast-path rejection straight off the transition table; the store's
        // conditional write below is still the authority under races.
        if let Some(status) = TaskStatus::from_status(&task.status)
            && !task_can_transition(status, TaskStatus::InProgress)
        {
            return Ok(TaskRunResult {
                task_id: task.id.clone(),
                disposition: ExecutionDisposition::NotClaimable,
                error: Some(format!("task not claimable (status: {})", task.status)),
                results: None,
            });
        }

        let claimed = self.store.claim_task(&task.id).await?;
        if !claimed {
            let current = self
                .store
                .get_task(&task.id)
                .await?
                .map(|t| t.status)
                .unwrap_or_else(|| "missing".to_string());
            let message = match TaskStatus::from_status(&current) {
                Some(status) if status.is_terminal() => {
                    format!("task already terminal ({current})")
                }
                _ => format!("task not claimable (status: {current})"),
            };
            return Ok(TaskRunResult {
                task_id: task.id.clone(),
                disposition: ExecutionDisposition::NotClaimable,
                error: Some(message),
                results: None,
            });
        }

        let Some(worker) = Worker::from_name(&task.worker) else {
            let message = format!("unknown worker identity '{}'", task.worker);
            self.store.fail_task(&task.id, &message).await?;
            return Ok(self.failed(task, message));
        };

        let Some(routine) = self.workers.get(worker) else {
            let message = format!("no routine registered for worker '{}'", worker.as_str());
            self.store.fail_task(&task.id, &message).await?;
            return Ok(self.failed(task, message));
        };

        let ctx = TaskContext {
            task_id: task.id.clone(),
            workflow_id: task.workflow_id.clone(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            worker,
            action: task
                .metadata
                .get("action")
                .and_then(|v| v.as_str())
                .unwrap_or("general")
                .to_string(),
            payload: task
                .metadata
                .get("payload")
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        };

        match routine.execute(&ctx).await {
            Ok(results) => {
                self.store
                    .complete_task(&task.id, &results)
                    .await
                    .context("failed to persist task result")?;
                self.note_task_completed(task).await?;
                info!(
                    "Task {} completed by {} worker",
                    task.id,
                    worker.as_str()
                );
                Ok(TaskRunResult {
                    task_id: task.id.clone(),
                    disposition: ExecutionDisposition::Completed,
                    error: None,
                    results: Some(results),
                })
            }
            Err(e) => {
                let message = e.to_string();
                // A failed task stays on the books with its error; siblings
                // and the parent workflow are untouched.
                self.store.fail_task(&task.id, &message).await?;
                warn!("Task {} failed: {}", task.id, message);
                Ok(self.failed(task, message))
            }
        }
    }

    fn failed(&self, task: &WorkflowTaskRecord, message: String) -> TaskRunResult {
        TaskRunResult {
            task_id: task.id.clone(),
            disposition: ExecutionDisposition::Failed,
            error: Some(message),
            results: None,
        }
    }

    /// Bump the parent workflow's counter; flip it to completed when every
    /// task has landed.
    async fn note_task_completed(&self, task: &WorkflowTaskRecord) -> Result<()> {
        let (completed, total) = self
            .store
            .increment_completed_tasks(&task.workflow_id)
            .await?;
        if completed >= total {
            self.store
                .update_workflow_status(&task.workflow_id, WorkflowStatus::Completed.as_str())
                .await?;
            info!("Workflow {} completed ({} tasks)", task.workflow_id, total);
        }
        Ok(())
    }
}
