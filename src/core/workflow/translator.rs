//! Delegation Translator: planner delegations in, one persisted workflow
//! plus its ordered tasks out.

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::core::store::{
    NewWorkflow, NewWorkflowTask, ProjectStore, WorkflowRecord, WorkflowTaskRecord,
};
use crate::core::workflow::{Delegation, infer_action, infer_workflow_kind, normalize_worker};

pub struct TranslatedWorkflow {
    pub workflow: WorkflowRecord,
    pub tasks: Vec<WorkflowTaskRecord>,
}

/// Persist a workflow and one pending task per delegation.
///
/// Worker names are normalized into the closed identity set, the workflow
/// kind is inferred from the normalized set, and task positions follow input
/// order. Creation is all-or-nothing: the task batch is transactional and a
/// failed batch deletes the workflow row again, so callers never observe a
/// workflow with zero tasks.
pub async fn create_workflow_from_delegations(
    store: &ProjectStore,
    owner_id: &str,
    project_id: Option<&str>,
    name: &str,
    summary: Option<&str>,
    delegations: &[Delegation],
) -> Result<TranslatedWorkflow> {
    if delegations.is_empty() {
        bail!("cannot create a workflow from zero delegations");
    }

    let kind = infer_workflow_kind(delegations);
    let metadata = serde_json::json!({
        "auto_executed": true,
        "delegations": delegations,
    });

    let workflow = store
        .create_workflow(&NewWorkflow {
            owner_id,
            project_id,
            name,
            kind: kind.as_str(),
            summary,
            total_tasks: delegations.len() as i64,
            metadata,
        })
        .await
        .context("failed to create workflow")?;

    let tasks: Vec<NewWorkflowTask> = delegations
        .iter()
        .enumerate()
        .map(|(index, delegation)| {
            let worker = normalize_worker(&delegation.worker);
            NewWorkflowTask {
                title: delegation.instruction.clone(),
                description: Some(format!(
                    "Delegated to the {} specialist",
                    worker.as_str()
                )),
                worker: worker.as_str().to_string(),
                position: index as i64,
                depends_on: None,
                due_date: None,
                metadata: serde_json::json!({
                    "delegated_from": "planner",
                    "original_worker": delegation.worker,
                    "action": infer_action(&delegation.instruction),
                }),
            }
        })
        .collect();

    let created = match store.create_tasks(&workflow.id, &tasks).await {
        Ok(created) => created,
        Err(e) => {
            // Compensate so a task-write failure never leaves an empty
            // workflow behind.
            if let Err(del_err) = store.delete_workflow(&workflow.id).await {
                warn!(
                    "Failed to roll back workflow {} after task insert error: {}",
                    workflow.id, del_err
                );
            }
            return Err(e).context("failed to create workflow tasks");
        }
    };

    info!(
        "Created workflow {} ({}) with {} tasks",
        workflow.id,
        kind.as_str(),
        created.len()
    );

    Ok(TranslatedWorkflow {
        workflow,
        tasks: created,
    })
}
