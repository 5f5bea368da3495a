//! The task lifecycle state machine.
//!
//! `Assigned -> InProgress -> Completed`, forward-only. The terminal
//! transition is the only one that is dispatch-eligible: it stamps
//! `completed_at` and tells the caller to enqueue completion side effects.

use chrono::{DateTime, Utc};

use crewforge_core::{DomainError, DomainResult};

use crate::task::{Task, TaskStatus};

/// Whether a successful transition must trigger background side effects.
///
/// Returned by [`TaskLifecycle::transition`]; callers must not re-derive this
/// from status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No background work for this transition.
    None,
    /// Entering `Completed`: scoring + ledger jobs must be enqueued.
    SideEffects,
}

impl Dispatch {
    pub fn is_eligible(self) -> bool {
        matches!(self, Dispatch::SideEffects)
    }
}

/// Single entry point for status mutation.
#[derive(Debug)]
pub struct TaskLifecycle;

impl TaskLifecycle {
    /// Advance `task` to `requested`.
    ///
    /// Rejects everything outside the allowed-next table (self-transitions,
    /// skips, anything out of `Completed`) with
    /// [`DomainError::InvalidTransition`], leaving the task unchanged.
    ///
    /// On entry into `Completed`, stamps `completed_at = now` and returns
    /// [`Dispatch::SideEffects`].
    pub fn transition(
        task: &mut Task,
        requested: TaskStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Dispatch> {
        if !task.status.can_advance_to(requested) {
            return Err(DomainError::invalid_transition(
                task.status.as_str(),
                requested.as_str(),
            ));
        }

        task.status = requested;
        if requested == TaskStatus::Completed {
            task.completed_at = Some(now);
            Ok(Dispatch::SideEffects)
        } else {
            Ok(Dispatch::None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Complexity;
    use crewforge_core::TenantId;

    fn test_task() -> Task {
        Task::new(TenantId::new(), Complexity::new(3).unwrap())
    }

    #[test]
    fn assigned_to_in_progress_is_not_dispatch_eligible() {
        let mut task = test_task();
        let dispatch =
            TaskLifecycle::transition(&mut task, TaskStatus::InProgress, Utc::now()).unwrap();

        assert_eq!(dispatch, Dispatch::None);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn completing_stamps_completed_at_and_is_dispatch_eligible() {
        let mut task = test_task();
        let now = Utc::now();

        TaskLifecycle::transition(&mut task, TaskStatus::InProgress, now).unwrap();
        assert!(task.completed_at.is_none());

        let dispatch = TaskLifecycle::transition(&mut task, TaskStatus::Completed, now).unwrap();
        assert!(dispatch.is_eligible());
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(now));
    }

    #[test]
    fn skipping_straight_to_completed_is_rejected() {
        let mut task = test_task();
        let err =
            TaskLifecycle::transition(&mut task, TaskStatus::Completed, Utc::now()).unwrap_err();

        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        // Row left unchanged.
        assert_eq!(task.status, TaskStatus::Assigned);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn self_transitions_are_rejected() {
        let mut task = test_task();
        for status in [TaskStatus::Assigned] {
            let err = TaskLifecycle::transition(&mut task, status, Utc::now()).unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn completed_is_terminal() {
        let mut task = test_task();
        TaskLifecycle::transition(&mut task, TaskStatus::InProgress, Utc::now()).unwrap();
        TaskLifecycle::transition(&mut task, TaskStatus::Completed, Utc::now()).unwrap();

        for requested in [
            TaskStatus::Assigned,
            TaskStatus::InProgress,
            TaskStatus::Completed,
        ] {
            let err = TaskLifecycle::transition(&mut task, requested, Utc::now()).unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransition { .. }));
        }
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn backwards_transition_is_rejected() {
        let mut task = test_task();
        TaskLifecycle::transition(&mut task, TaskStatus::InProgress, Utc::now()).unwrap();

        let err =
            TaskLifecycle::transition(&mut task, TaskStatus::Assigned, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = TaskStatus> {
            prop_oneof![
                Just(TaskStatus::Assigned),
                Just(TaskStatus::InProgress),
                Just(TaskStatus::Completed),
            ]
        }

        proptest! {
            /// Property: for any sequence of requested transitions, the
            /// completed_at invariant holds and status never moves backwards.
            #[test]
            fn completed_at_iff_completed(requests in prop::collection::vec(any_status(), 0..16)) {
                let mut task = test_task();
                for requested in requests {
                    let _ = TaskLifecycle::transition(&mut task, requested, Utc::now());
                    prop_assert_eq!(
                        task.completed_at.is_some(),
                        task.status == TaskStatus::Completed
                    );
                }
            }
        }
    }
}
