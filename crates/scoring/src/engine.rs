//! Deterministic performance score computation.
//!
//! Weighting model:
//! - completion rate        → 40 points
//! - on-time rate           → 35 points
//! - average complexity / 5 → 25 points
//!
//! Rates with no evidence are reported as absent, not zero. The score itself
//! is absent only when the employee has no assigned tasks at all.

use serde::{Deserialize, Serialize};

use crewforge_tasks::{Task, TaskStatus};

const COMPLETION_WEIGHT: f64 = 40.0;
const ON_TIME_WEIGHT: f64 = 35.0;
const COMPLEXITY_WEIGHT: f64 = 25.0;

/// Letter grade bands over the 0–100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::APlus
        } else if score >= 80.0 {
            Grade::A
        } else if score >= 70.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else {
            Grade::D
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

impl core::fmt::Display for Grade {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three factor values feeding the weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreFactors {
    /// completed / assigned. `None` when no tasks are assigned.
    pub completion_rate: Option<f64>,
    /// on-time completions / completions-with-due-date. `None` when no
    /// completed task carries a due date.
    pub on_time_rate: Option<f64>,
    /// Mean of the 1–5 complexity values. `None` when no tasks are assigned.
    pub avg_complexity: Option<f64>,
}

/// Output of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// Weighted score rounded to one decimal; absent with zero assigned tasks.
    pub score: Option<f64>,
    pub grade: Option<Grade>,
    pub factors: ScoreFactors,
    /// Number of assigned tasks the snapshot contained.
    pub task_count: usize,
}

impl ScoreCard {
    /// Card for an employee with no task history.
    pub fn empty() -> Self {
        Self {
            score: None,
            grade: None,
            factors: ScoreFactors::default(),
            task_count: 0,
        }
    }
}

/// Stateless, deterministic scoring computation.
#[derive(Debug)]
pub struct ScoringEngine;

impl ScoringEngine {
    /// Evaluate one employee's task-history snapshot.
    ///
    /// The snapshot must contain only that employee's assigned tasks; the
    /// engine does not filter by assignee.
    pub fn evaluate(tasks: &[Task]) -> ScoreCard {
        if tasks.is_empty() {
            return ScoreCard::empty();
        }

        let total = tasks.len();
        let completed: Vec<&Task> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .collect();

        let completion_rate = completed.len() as f64 / total as f64;

        let with_due: Vec<&&Task> = completed.iter().filter(|t| t.due_at.is_some()).collect();
        let on_time_rate = if with_due.is_empty() {
            None
        } else {
            let on_time = with_due.iter().filter(|t| t.completed_on_time()).count();
            Some(on_time as f64 / with_due.len() as f64)
        };

        let avg_complexity = tasks
            .iter()
            .map(|t| f64::from(t.complexity.value()))
            .sum::<f64>()
            / total as f64;

        // Absent on-time evidence contributes zero points without making the
        // whole score absent.
        let weighted = completion_rate * COMPLETION_WEIGHT
            + on_time_rate.unwrap_or(0.0) * ON_TIME_WEIGHT
            + (avg_complexity / 5.0) * COMPLEXITY_WEIGHT;
        let score = round1(weighted);

        ScoreCard {
            score: Some(score),
            grade: Some(Grade::from_score(score)),
            factors: ScoreFactors {
                completion_rate: Some(completion_rate),
                on_time_rate,
                avg_complexity: Some(avg_complexity),
            },
            task_count: total,
        }
    }
}

/// Round to one decimal place (half away from zero).
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use crewforge_core::TenantId;
    use crewforge_tasks::{Complexity, TaskLifecycle, TaskStatus};

    fn task(complexity: u8) -> Task {
        Task::new(TenantId::new(), Complexity::new(complexity).unwrap())
    }

    fn complete(mut t: Task, at: chrono::DateTime<Utc>) -> Task {
        TaskLifecycle::transition(&mut t, TaskStatus::InProgress, at).unwrap();
        TaskLifecycle::transition(&mut t, TaskStatus::Completed, at).unwrap();
        t
    }

    #[test]
    fn worked_example_from_the_weighting_model() {
        // completion_rate = 0.90, on_time_rate = 0.85, avg_complexity = 4.0
        // => round1(36 + 29.75 + 20) = 85.8, grade A
        let weighted = 0.90 * 40.0 + 0.85 * 35.0 + (4.0 / 5.0) * 25.0;
        assert_eq!(round1(weighted), 85.8);
        assert_eq!(Grade::from_score(85.8), Grade::A);
    }

    #[test]
    fn exact_fractions_end_to_end() {
        let now = Utc::now();
        let due = now + Duration::hours(1);

        // 4 tasks of complexity 4; 3 completed, 2 with due dates, 1 on time.
        let tasks = vec![
            complete(task(4).with_due_at(due), now),                       // on time
            complete(task(4).with_due_at(due), now + Duration::hours(2)),  // late
            complete(task(4), now),                                        // no due date
            task(4),                                                       // still assigned
        ];

        let card = ScoringEngine::evaluate(&tasks);
        // completion 3/4 = 0.75, on-time 1/2 = 0.5, avg complexity 4.0
        // => 30 + 17.5 + 20 = 67.5, grade C
        assert_eq!(card.factors.completion_rate, Some(0.75));
        assert_eq!(card.factors.on_time_rate, Some(0.5));
        assert_eq!(card.factors.avg_complexity, Some(4.0));
        assert_eq!(card.score, Some(67.5));
        assert_eq!(card.grade, Some(Grade::C));
        assert_eq!(card.task_count, 4);
    }

    #[test]
    fn zero_tasks_yields_absent_score_not_zero() {
        let card = ScoringEngine::evaluate(&[]);
        assert_eq!(card.score, None);
        assert_eq!(card.grade, None);
        assert_eq!(card.factors.completion_rate, None);
        assert_eq!(card.task_count, 0);
    }

    #[test]
    fn no_due_dates_means_absent_on_time_rate_but_present_score() {
        let now = Utc::now();
        let tasks = vec![complete(task(5), now), task(5)];

        let card = ScoringEngine::evaluate(&tasks);
        assert_eq!(card.factors.on_time_rate, None);
        // 0.5 * 40 + 0 + (5/5) * 25 = 45
        assert_eq!(card.score, Some(45.0));
        assert_eq!(card.grade, Some(Grade::D));
    }

    #[test]
    fn grade_bands() {
        assert_eq!(Grade::from_score(95.0), Grade::APlus);
        assert_eq!(Grade::from_score(90.0), Grade::APlus);
        assert_eq!(Grade::from_score(89.9), Grade::A);
        assert_eq!(Grade::from_score(80.0), Grade::A);
        assert_eq!(Grade::from_score(70.0), Grade::B);
        assert_eq!(Grade::from_score(60.0), Grade::C);
        assert_eq!(Grade::from_score(59.9), Grade::D);
        assert_eq!(Grade::from_score(0.0), Grade::D);
    }

    #[test]
    fn grade_serializes_with_plus_sign() {
        let json = serde_json::to_string(&Grade::APlus).unwrap();
        assert_eq!(json, "\"A+\"");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any non-empty snapshot scores within [0, 100].
            #[test]
            fn score_is_bounded(
                complexities in prop::collection::vec(1u8..=5, 1..32),
                completed_mask in prop::collection::vec(any::<bool>(), 1..32)
            ) {
                let now = Utc::now();
                let tasks: Vec<Task> = complexities
                    .iter()
                    .zip(completed_mask.iter().cycle())
                    .map(|(&c, &done)| {
                        let t = task(c).with_due_at(now + Duration::hours(1));
                        if done { complete(t, now) } else { t }
                    })
                    .collect();

                let card = ScoringEngine::evaluate(&tasks);
                let score = card.score.unwrap();
                prop_assert!((0.0..=100.0).contains(&score));
                // Rounded to one decimal.
                prop_assert!((score * 10.0 - (score * 10.0).round()).abs() < 1e-9);
            }
        }
    }
}
