use serde::{Deserialize, Serialize};

/// Specialist worker identities tasks are assigned to. This is a closed set:
/// free-text worker names coming out of the planner are normalized into one
/// of these via [`crate::core::workflow::normalize_worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Worker {
    Creative,
    Distribution,
    Cataloging,
    Compliance,
}

impl Worker {
    pub const ALL: [Worker; 4] = [
        Worker::Creative,
        Worker::Distribution,
        Worker::Cataloging,
        Worker::Compliance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Worker::Creative => "creative",
            Worker::Distribution => "distribution",
            Worker::Cataloging => "cataloging",
            Worker::Compliance => "compliance",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "creative" => Some(Worker::Creative),
            "distribution" => Some(Worker::Distribution),
            "cataloging" => Some(Worker::Cataloging),
            "compliance" => Some(Worker::Compliance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Licensing,
    Creative,
    Distribution,
    Cataloging,
    Custom,
}

impl WorkflowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowKind::Licensing => "licensing",
            WorkflowKind::Creative => "creative",
            WorkflowKind::Distribution => "distribution",
            WorkflowKind::Cataloging => "cataloging",
            WorkflowKind::Custom => "custom",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "licensing" => Some(WorkflowKind::Licensing),
            "creative" => Some(WorkflowKind::Creative),
            "distribution" => Some(WorkflowKind::Distribution),
            "cataloging" => Some(WorkflowKind::Cataloging),
            "custom" => Some(WorkflowKind::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Active,
    Completed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Active => "active",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "active" => Some(WorkflowStatus::Active),
            "completed" => Some(WorkflowStatus::Completed),
            "cancelled" => Some(WorkflowStatus::Cancelled),
            _ => None,
        }
    }
}

/// Task lifecycle. `pending` is the only initial state; `completed`,
/// `failed` and `skipped` are terminal. The engine itself never writes
/// `skipped`; it exists so operator-side skips count as terminal in the
/// workflow read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "skipped" => Some(TaskStatus::Skipped),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

/// Video job lifecycle. `succeeded` additionally requires `output_location`
/// to be set before the transition counts as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "succeeded" => Some(JobStatus::Succeeded),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// One delegation decision from the planner: a free-text target worker and
/// the instruction for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegation {
    pub worker: String,
    pub instruction: String,
}
