//! Workflow engine: delegation translation, task execution, and per-worker
//! dispatch.
//!
//! The pure pieces live here so they can be unit-tested exhaustively:
//! worker-name normalization, workflow-kind inference, action inference, and
//! the task/job transition tables. Everything stateful goes through
//! [`crate::core::store::ProjectStore`].

pub mod dispatcher;
pub mod executor;
pub mod translator;
pub mod types;

pub use types::{
    Delegation, JobStatus, TaskStatus, Worker, WorkflowKind, WorkflowStatus,
};

const CREATIVE_KEYWORDS: [&str; 4] = ["creative", "script", "concept", "storyboard"];
const DISTRIBUTION_KEYWORDS: [&str; 4] = ["distribution", "posting", "schedule", "marketing"];
const CATALOGING_KEYWORDS: [&str; 3] = ["catalog", "asset", "archive"];
const COMPLIANCE_KEYWORDS: [&str; 4] = ["compliance", "licensing", "watermark", "clearance"];

/// Normalize a free-text worker name into one of the fixed identities.
///
/// Substring keyword matching over the lowercased input, first match in a
/// fixed check order wins. Total: anything unmatched falls back to the
/// creative worker, so every planner output maps to exactly one identity.
pub fn normalize_worker(raw: &str) -> Worker {
    let lowered = raw.to_lowercase();
    let matches_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    if matches_any(&CREATIVE_KEYWORDS) {
        Worker::Creative
    } else if matches_any(&DISTRIBUTION_KEYWORDS) {
        Worker::Distribution
    } else if matches_any(&CATALOGING_KEYWORDS) {
        Worker::Cataloging
    } else if matches_any(&COMPLIANCE_KEYWORDS) {
        Worker::Compliance
    } else {
        Worker::Creative
    }
}

/// Infer the workflow kind from the set of normalized workers.
///
/// Precedence is a fixed total order, so the result is deterministic:
/// compliance > creative > distribution > cataloging, else custom.
pub fn infer_workflow_kind(delegations: &[Delegation]) -> WorkflowKind {
    let workers: Vec<Worker> = delegations
        .iter()
        .map(|d| normalize_worker(&d.worker))
        .collect();

    if workers.contains(&Worker::Compliance) {
        WorkflowKind::Licensing
    } else if workers.contains(&Worker::Creative) {
        WorkflowKind::Creative
    } else if workers.contains(&Worker::Distribution) {
        WorkflowKind::Distribution
    } else if workers.contains(&Worker::Cataloging) {
        WorkflowKind::Cataloging
    } else {
        WorkflowKind::Custom
    }
}

/// Infer the action name a worker routine should run from the instruction
/// text. An explicit `action:` prefix wins; otherwise keyword defaults.
pub fn infer_action(instruction: &str) -> String {
    let prefix = regex::Regex::new(r"^([A-Za-z_]+):").unwrap();
    if let Some(cap) = prefix.captures(instruction) {
        return cap[1].to_string();
    }

    let lowered = instruction.to_lowercase();
    if lowered.contains("video") {
        return "render_video".to_string();
    }
    if lowered.contains("script") {
        return "draft_script".to_string();
    }
    if lowered.contains("cover") || lowered.contains("art") {
        return "design_cover".to_string();
    }
    if lowered.contains("distribution") {
        return "plan_distribution".to_string();
    }
    if lowered.contains("catalog") {
        return "catalog_asset".to_string();
    }
    if lowered.contains("licensing") || lowered.contains("audit") {
        return "audit_licensing".to_string();
    }
    "general".to_string()
}

/// Task transition table. Claiming is the only way out of `pending` for the
/// engine; `skipped` is reachable for operator-side skips. No transition
/// leaves a terminal state.
pub fn task_can_transition(from: TaskStatus, to: TaskStatus) -> bool {
    if from == to {
        return true;
    }
    match from {
        TaskStatus::Pending => matches!(to, TaskStatus::InProgress | TaskStatus::Skipped),
        TaskStatus::InProgress => matches!(to, TaskStatus::Completed | TaskStatus::Failed),
        TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped => false,
    }
}

/// Video job transition table. Polling a `running` job that is still
/// processing is a self-loop (`from == to`), which is always allowed.
pub fn job_can_transition(from: JobStatus, to: JobStatus) -> bool {
    if from == to {
        return true;
    }
    match from {
        JobStatus::Queued => matches!(to, JobStatus::Running | JobStatus::Failed),
        JobStatus::Running => matches!(to, JobStatus::Succeeded | JobStatus::Failed),
        JobStatus::Succeeded | JobStatus::Failed => false,
    }
}

#[cfg(test)]
mod tests;
