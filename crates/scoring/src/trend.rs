//! Score trend over the performance history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::PerformanceSample;

/// Minimum score delta counted as movement.
const TREND_THRESHOLD: f64 = 1.0;

const WINDOW_DAYS: i64 = 30;

/// Direction of score movement between the two most recent 30-day windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl Trend {
    /// Compare mean sample score of the last 30 days against the preceding
    /// 30–60 day window. Either window empty (no scored samples) yields
    /// `InsufficientData`.
    pub fn from_samples(samples: &[PerformanceSample], now: DateTime<Utc>) -> Self {
        let recent_start = now - Duration::days(WINDOW_DAYS);
        let prior_start = now - Duration::days(WINDOW_DAYS * 2);

        let recent = mean_score(samples, recent_start, now);
        let prior = mean_score(samples, prior_start, recent_start);

        match (recent, prior) {
            (Some(recent), Some(prior)) => {
                let delta = recent - prior;
                if delta >= TREND_THRESHOLD {
                    Trend::Improving
                } else if delta <= -TREND_THRESHOLD {
                    Trend::Declining
                } else {
                    Trend::Stable
                }
            }
            _ => Trend::InsufficientData,
        }
    }
}

fn mean_score(
    samples: &[PerformanceSample],
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Option<f64> {
    let scores: Vec<f64> = samples
        .iter()
        .filter(|s| s.created_at >= from && s.created_at < until)
        .filter_map(|s| s.score)
        .collect();

    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewforge_core::{EmployeeId, TenantId};
    use uuid::Uuid;

    fn sample(score: f64, days_ago: i64, now: DateTime<Utc>) -> PerformanceSample {
        PerformanceSample {
            id: Uuid::now_v7(),
            tenant_id: TenantId::new(),
            employee_id: EmployeeId::new(),
            score: Some(score),
            completion_rate: Some(1.0),
            on_time_rate: None,
            avg_complexity: Some(3.0),
            task_count: 4,
            created_at: now - Duration::days(days_ago),
        }
    }

    #[test]
    fn improving_when_recent_mean_is_a_point_higher() {
        let now = Utc::now();
        let samples = vec![sample(70.0, 45, now), sample(72.0, 10, now)];
        assert_eq!(Trend::from_samples(&samples, now), Trend::Improving);
    }

    #[test]
    fn declining_when_recent_mean_dropped() {
        let now = Utc::now();
        let samples = vec![
            sample(80.0, 50, now),
            sample(84.0, 40, now),
            sample(78.0, 5, now),
        ];
        // prior mean 82, recent 78 => delta -4
        assert_eq!(Trend::from_samples(&samples, now), Trend::Declining);
    }

    #[test]
    fn stable_within_the_threshold() {
        let now = Utc::now();
        let samples = vec![sample(75.0, 35, now), sample(75.5, 3, now)];
        assert_eq!(Trend::from_samples(&samples, now), Trend::Stable);
    }

    #[test]
    fn insufficient_data_when_a_window_is_empty() {
        let now = Utc::now();
        assert_eq!(Trend::from_samples(&[], now), Trend::InsufficientData);

        let only_recent = vec![sample(90.0, 2, now)];
        assert_eq!(
            Trend::from_samples(&only_recent, now),
            Trend::InsufficientData
        );

        let only_prior = vec![sample(90.0, 40, now)];
        assert_eq!(
            Trend::from_samples(&only_prior, now),
            Trend::InsufficientData
        );
    }

    #[test]
    fn samples_older_than_sixty_days_are_ignored() {
        let now = Utc::now();
        let samples = vec![
            sample(10.0, 90, now), // out of both windows
            sample(75.0, 40, now),
            sample(75.2, 1, now),
        ];
        assert_eq!(Trend::from_samples(&samples, now), Trend::Stable);
    }

    #[test]
    fn unscored_samples_do_not_count_as_rows() {
        let now = Utc::now();
        let mut empty_score = sample(0.0, 40, now);
        empty_score.score = None;
        let samples = vec![empty_score, sample(80.0, 5, now)];
        assert_eq!(Trend::from_samples(&samples, now), Trend::InsufficientData);
    }
}
