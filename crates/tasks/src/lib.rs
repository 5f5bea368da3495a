//! `crewforge-tasks` — task domain model and lifecycle state machine.
//!
//! Status is a forward-only state machine. All status mutation goes through
//! [`lifecycle::TaskLifecycle::transition`]; no other writer exists, so the
//! decision "should side effects be enqueued for this transition" has exactly
//! one authority.

pub mod lifecycle;
pub mod task;

pub use lifecycle::{Dispatch, TaskLifecycle};
pub use task::{Complexity, Priority, SkillSet, Task, TaskStatus};
