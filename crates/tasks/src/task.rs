use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crewforge_core::{DomainError, DomainResult, EmployeeId, TaskId, TenantId};

/// Task status lifecycle. Forward-only; see [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Assigned,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// The allowed-next-states table. This is the only place legal
    /// transitions are defined.
    pub fn allowed_next(self) -> &'static [TaskStatus] {
        match self {
            TaskStatus::Assigned => &[TaskStatus::InProgress],
            TaskStatus::InProgress => &[TaskStatus::Completed],
            TaskStatus::Completed => &[],
        }
    }

    pub fn can_advance_to(self, requested: TaskStatus) -> bool {
        self.allowed_next().contains(&requested)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl core::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(TaskStatus::Assigned),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(DomainError::validation(format!(
                "unknown task status: {other}"
            ))),
        }
    }
}

/// Task complexity on a 1–5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Complexity(u8);

impl Complexity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> DomainResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DomainError::validation(format!(
                "complexity must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Scheduling priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl core::str::FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(DomainError::validation(format!(
                "unknown priority: {other}"
            ))),
        }
    }
}

/// Set of skill tags required to work a task.
///
/// Tags are normalized to lowercase; ordering is stable (BTreeSet) so the set
/// serializes deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, skill: impl AsRef<str>) {
        let normalized = skill.as_ref().trim().to_lowercase();
        if !normalized.is_empty() {
            self.0.insert(normalized);
        }
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.0.contains(&skill.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for skill in iter {
            set.insert(skill);
        }
        set
    }
}

/// A unit of assignable work, owned by a tenant.
///
/// Invariants:
/// - `completed_at` is `Some` if and only if `status == Completed`
/// - status only advances along [`TaskStatus::allowed_next`]
/// - never hard-deleted; `active = false` is the deactivation marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub tenant_id: TenantId,
    pub assignee: Option<EmployeeId>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub complexity: Complexity,
    pub required_skills: SkillSet,
    pub due_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task in the initial `Assigned` state.
    pub fn new(tenant_id: TenantId, complexity: Complexity) -> Self {
        Self {
            id: TaskId::new(),
            tenant_id,
            assignee: None,
            status: TaskStatus::Assigned,
            priority: Priority::default(),
            complexity,
            required_skills: SkillSet::new(),
            due_at: None,
            completed_at: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_assignee(mut self, assignee: EmployeeId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_required_skills(mut self, skills: SkillSet) -> Self {
        self.required_skills = skills;
        self
    }

    /// Soft-deactivate. Tasks are never hard-deleted.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Completed at or before its due date. `false` when either timestamp is
    /// missing; on-time statistics only consider tasks where both exist.
    pub fn completed_on_time(&self) -> bool {
        match (self.completed_at, self.due_at) {
            (Some(done), Some(due)) => done <= due,
            _ => false,
        }
    }
}
