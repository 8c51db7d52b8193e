//! Engine tests over a throwaway store and scripted workers: claim
//! semantics, counter invariants, failure isolation, dispatch ordering, and
//! the auto-execute fan-out.

use std::sync::Arc;

use crate::core::store::ProjectStore;
use crate::core::test_support::{ScriptedWorker, open_temp_store};
use crate::core::worker::WorkerRegistry;
use crate::core::workflow::dispatcher::TaskDispatcher;
use crate::core::workflow::executor::{ExecutionDisposition, TaskExecutor};
use crate::core::workflow::translator::create_workflow_from_delegations;
use crate::core::workflow::{Delegation, Worker};

fn delegation(worker: &str, instruction: &str) -> Delegation {
    Delegation {
        worker: worker.to_string(),
        instruction: instruction.to_string(),
    }
}

async fn translate(
    store: &ProjectStore,
    delegations: &[Delegation],
) -> crate::core::workflow::translator::TranslatedWorkflow {
    create_workflow_from_delegations(store, "owner-1", None, "Test workflow", None, delegations)
        .await
        .expect("translate")
}

fn engine(
    store: &Arc<ProjectStore>,
    creative: Arc<ScriptedWorker>,
) -> (Arc<TaskExecutor>, Arc<TaskDispatcher>) {
    let registry = WorkerRegistry::new().with_routine(Worker::Creative, creative);
    let executor = Arc::new(TaskExecutor::new(store.clone(), Arc::new(registry)));
    let dispatcher = Arc::new(TaskDispatcher::new(store.clone(), executor.clone()));
    (executor, dispatcher)
}

#[tokio::test]
async fn translator_persists_workflow_and_ordered_tasks() {
    let (_dir, store) = open_temp_store().await;
    let out = translate(
        &store,
        &[
            delegation("concept", "write the script outline"),
            delegation("posting", "plan distribution"),
            delegation("unknown-xyz", "mystery chore"),
        ],
    )
    .await;

    assert_eq!(out.workflow.kind, "creative");
    assert_eq!(out.workflow.status, "active");
    assert_eq!(out.workflow.total_tasks, 3);
    assert_eq!(out.workflow.completed_tasks, 0);

    assert_eq!(out.tasks.len(), 3);
    for (index, task) in out.tasks.iter().enumerate() {
        assert_eq!(task.position, index as i64);
        assert_eq!(task.status, "pending");
    }
    assert_eq!(out.tasks[0].worker, "creative");
    assert_eq!(out.tasks[1].worker, "distribution");
    // Fallback identity for the unmapped name.
    assert_eq!(out.tasks[2].worker, "creative");

    // Provenance and inferred action ride along in metadata.
    assert_eq!(
        out.tasks[0].metadata["original_worker"],
        serde_json::json!("concept")
    );
    assert_eq!(out.tasks[0].metadata["action"], serde_json::json!("draft_script"));
}

#[tokio::test]
async fn translator_rejects_empty_delegations() {
    let (_dir, store) = open_temp_store().await;
    let result =
        create_workflow_from_delegations(&store, "owner-1", None, "Empty", None, &[]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn executing_all_tasks_completes_the_workflow() {
    let (_dir, store) = open_temp_store().await;
    let creative = Arc::new(ScriptedWorker::succeeding());
    let (executor, _) = engine(&store, creative.clone());

    let out = translate(
        &store,
        &[
            delegation("creative", "task one"),
            delegation("creative", "task two"),
        ],
    )
    .await;

    for task in &out.tasks {
        let result = executor.execute(task).await.expect("execute");
        assert_eq!(result.disposition, ExecutionDisposition::Completed);
    }

    let workflow = store
        .get_workflow(&out.workflow.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(workflow.completed_tasks, 2);
    assert_eq!(workflow.total_tasks, 2);
    assert_eq!(workflow.status, "completed");
    assert_eq!(creative.call_count(), 2);

    let tasks = store.list_tasks(&out.workflow.id).await.unwrap();
    for task in tasks {
        assert_eq!(task.status, "completed");
        assert!(task.completed_at.is_some());
        assert_eq!(task.metadata["results"]["echo"], serde_json::json!(task.title));
    }
}

#[tokio::test]
async fn failed_task_is_isolated_and_does_not_count() {
    let (_dir, store) = open_temp_store().await;
    let creative = Arc::new(ScriptedWorker::failing_on("task two"));
    let (executor, _) = engine(&store, creative.clone());

    let out = translate(
        &store,
        &[
            delegation("creative", "task one"),
            delegation("creative", "task two"),
            delegation("creative", "task three"),
        ],
    )
    .await;

    for task in &out.tasks {
        executor.execute(task).await.expect("execute");
    }

    let workflow = store
        .get_workflow(&out.workflow.id)
        .await
        .unwrap()
        .unwrap();
    // Two completions, one failure: the counter only counts completions and
    // the workflow stays active.
    assert_eq!(workflow.completed_tasks, 2);
    assert_eq!(workflow.status, "active");

    let tasks = store.list_tasks(&out.workflow.id).await.unwrap();
    assert_eq!(tasks[0].status, "completed");
    assert_eq!(tasks[1].status, "failed");
    assert!(
        tasks[1]
            .error_message
            .as_deref()
            .unwrap_or_default()
            .contains("scripted failure")
    );
    assert_eq!(tasks[2].status, "completed");
}

#[tokio::test]
async fn concurrent_claims_run_the_routine_exactly_once() {
    let (_dir, store) = open_temp_store().await;
    let creative = Arc::new(ScriptedWorker::succeeding());
    let (executor, _) = engine(&store, creative.clone());

    let out = translate(&store, &[delegation("creative", "solo task")]).await;
    let task = &out.tasks[0];

    let (a, b) = tokio::join!(executor.execute(task), executor.execute(task));
    let (a, b) = (a.unwrap(), b.unwrap());

    let dispositions = [a.disposition, b.disposition];
    assert!(dispositions.contains(&ExecutionDisposition::Completed));
    assert!(dispositions.contains(&ExecutionDisposition::NotClaimable));
    assert_eq!(creative.call_count(), 1);
}

#[tokio::test]
async fn reexecuting_a_terminal_task_is_a_noop() {
    let (_dir, store) = open_temp_store().await;
    let creative = Arc::new(ScriptedWorker::succeeding());
    let (executor, _) = engine(&store, creative.clone());

    let out = translate(&store, &[delegation("creative", "once only")]).await;
    let task = &out.tasks[0];

    let first = executor.execute(task).await.unwrap();
    assert_eq!(first.disposition, ExecutionDisposition::Completed);

    let second = executor.execute(task).await.unwrap();
    assert_eq!(second.disposition, ExecutionDisposition::NotClaimable);
    assert!(second.error.unwrap().contains("completed"));
    assert_eq!(creative.call_count(), 1);

    // The counter did not double-increment.
    let workflow = store
        .get_workflow(&out.workflow.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(workflow.completed_tasks, 1);
}

#[tokio::test]
async fn task_without_registered_routine_fails_with_context() {
    let (_dir, store) = open_temp_store().await;
    let creative = Arc::new(ScriptedWorker::succeeding());
    // Registry only knows the creative worker.
    let (executor, _) = engine(&store, creative);

    let out = translate(&store, &[delegation("posting", "post the teaser")]).await;
    let result = executor.execute(&out.tasks[0]).await.unwrap();
    assert_eq!(result.disposition, ExecutionDisposition::Failed);

    let task = store.get_task(&out.tasks[0].id).await.unwrap().unwrap();
    assert_eq!(task.status, "failed");
    assert!(
        task.error_message
            .unwrap()
            .contains("no routine registered")
    );
}

#[tokio::test]
async fn dispatch_runs_tasks_in_position_order_up_to_limit() {
    let (_dir, store) = open_temp_store().await;
    let creative = Arc::new(ScriptedWorker::succeeding());
    let (_, dispatcher) = engine(&store, creative.clone());

    translate(
        &store,
        &[
            delegation("creative", "first"),
            delegation("creative", "second"),
            delegation("creative", "third"),
        ],
    )
    .await;

    let results = dispatcher.dispatch(Worker::Creative, 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.succeeded()));
    assert_eq!(creative.call_count(), 2);

    // The remaining task is still pending and picked up by the next pass.
    let rest = dispatcher.dispatch(Worker::Creative, 5).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(creative.call_count(), 3);
}

#[tokio::test]
async fn dispatch_skips_workflows_that_are_not_active() {
    let (_dir, store) = open_temp_store().await;
    let creative = Arc::new(ScriptedWorker::succeeding());
    let (_, dispatcher) = engine(&store, creative.clone());

    let out = translate(&store, &[delegation("creative", "stale task")]).await;
    store
        .update_workflow_status(&out.workflow.id, "cancelled")
        .await
        .unwrap();

    let results = dispatcher.dispatch(Worker::Creative, 5).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(creative.call_count(), 0);
}

#[tokio::test]
async fn auto_execute_triggers_every_distinct_worker() {
    let (_dir, store) = open_temp_store().await;
    let creative = Arc::new(ScriptedWorker::succeeding());
    let distribution = Arc::new(ScriptedWorker::succeeding());
    let registry = WorkerRegistry::new()
        .with_routine(Worker::Creative, creative.clone())
        .with_routine(Worker::Distribution, distribution.clone());
    let executor = Arc::new(TaskExecutor::new(store.clone(), Arc::new(registry)));
    let dispatcher = Arc::new(TaskDispatcher::new(store.clone(), executor));

    let report = dispatcher
        .auto_execute(
            "owner-1",
            Some("project-9"),
            "Launch push",
            Some("teaser + rollout"),
            &[
                delegation("concept", "draft the teaser script"),
                delegation("posting", "plan the rollout"),
                delegation("script", "write the long-form outline"),
            ],
        )
        .await
        .expect("auto execute");

    assert_eq!(report.tasks_created, 3);
    assert_eq!(report.workers.len(), 2);
    assert!(report.workers.iter().all(|w| w.triggered));
    // Workers are reported in first-appearance order.
    assert_eq!(report.workers[0].worker, Worker::Creative);
    assert_eq!(report.workers[1].worker, Worker::Distribution);

    assert_eq!(creative.call_count(), 2);
    assert_eq!(distribution.call_count(), 1);

    let workflow = store
        .get_workflow(&report.workflow_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(workflow.status, "completed");
    assert_eq!(workflow.completed_tasks, 3);
}

#[tokio::test]
async fn counter_never_exceeds_total() {
    let (_dir, store) = open_temp_store().await;
    let creative = Arc::new(ScriptedWorker::succeeding());
    let (executor, _) = engine(&store, creative);

    let out = translate(&store, &[delegation("creative", "only one")]).await;
    executor.execute(&out.tasks[0]).await.unwrap();

    // Even a stray extra increment is clamped by the store guard.
    let (completed, total) = store
        .increment_completed_tasks(&out.workflow.id)
        .await
        .unwrap();
    assert_eq!((completed, total), (1, 1));
}
