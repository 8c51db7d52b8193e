use crate::core::workflow::{
    JobStatus, TaskStatus, job_can_transition, task_can_transition,
};

#[test]
fn task_happy_path_is_allowed() {
    assert!(task_can_transition(TaskStatus::Pending, TaskStatus::InProgress));
    assert!(task_can_transition(TaskStatus::InProgress, TaskStatus::Completed));
    assert!(task_can_transition(TaskStatus::InProgress, TaskStatus::Failed));
}

#[test]
fn task_pending_is_only_claimable_forward() {
    assert!(!task_can_transition(TaskStatus::Pending, TaskStatus::Completed));
    assert!(!task_can_transition(TaskStatus::Pending, TaskStatus::Failed));
}

#[test]
fn task_terminal_states_admit_no_transition() {
    for terminal in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Skipped] {
        for to in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Skipped,
        ] {
            if terminal == to {
                continue;
            }
            assert!(
                !task_can_transition(terminal, to),
                "unexpected {terminal:?} -> {to:?}"
            );
        }
        assert!(terminal.is_terminal());
    }
}

#[test]
fn task_self_transition_is_a_noop() {
    for status in [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ] {
        assert!(task_can_transition(status, status));
    }
}

#[test]
fn job_happy_path_is_allowed() {
    assert!(job_can_transition(JobStatus::Queued, JobStatus::Running));
    assert!(job_can_transition(JobStatus::Running, JobStatus::Succeeded));
}

#[test]
fn job_failure_is_reachable_from_queued_and_running() {
    assert!(job_can_transition(JobStatus::Queued, JobStatus::Failed));
    assert!(job_can_transition(JobStatus::Running, JobStatus::Failed));
}

#[test]
fn job_cannot_skip_running() {
    assert!(!job_can_transition(JobStatus::Queued, JobStatus::Succeeded));
}

#[test]
fn job_poll_self_loop_is_allowed() {
    assert!(job_can_transition(JobStatus::Running, JobStatus::Running));
}

#[test]
fn job_terminal_states_admit_no_transition() {
    for terminal in [JobStatus::Succeeded, JobStatus::Failed] {
        for to in [JobStatus::Queued, JobStatus::Running, JobStatus::Succeeded, JobStatus::Failed] {
            if terminal == to {
                continue;
            }
            assert!(
                !job_can_transition(terminal, to),
                "unexpected {terminal:?} -> {to:?}"
            );
        }
        assert!(terminal.is_terminal());
    }
}

#[test]
fn status_strings_round_trip() {
    for status in [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Skipped,
    ] {
        assert_eq!(TaskStatus::from_status(status.as_str()), Some(status));
    }
    for status in [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
    ] {
        assert_eq!(JobStatus::from_status(status.as_str()), Some(status));
    }
    assert_eq!(TaskStatus::from_status("bogus"), None);
    assert_eq!(JobStatus::from_status("bogus"), None);
}
