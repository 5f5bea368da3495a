//! Narrative explanations for score cards.
//!
//! The real narrative generator is an external collaborator that may fail.
//! Callers must still get usable text, so this module pairs the [`Narrator`]
//! seam with a deterministic template fallback.

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::ScoreCard;
use crate::trend::Trend;

/// Narrative backend failure. Never fails the scoring pass; callers fall back
/// to the template rendering.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative backend unavailable: {0}")]
    Unavailable(String),

    #[error("narrative generation failed: {0}")]
    Generation(String),
}

/// Produces explanatory text for a numeric score card.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn explain(&self, card: &ScoreCard, trend: Trend) -> Result<String, NarrativeError>;
}

/// Deterministic, template-based narrator.
///
/// Used directly in tests and as the fallback whenever an external narrator
/// errors out.
#[derive(Debug, Default)]
pub struct TemplateNarrator;

impl TemplateNarrator {
    pub fn render(card: &ScoreCard, trend: Trend) -> String {
        let Some(score) = card.score else {
            return "No performance score yet: no tasks have been assigned.".to_string();
        };

        let grade = card
            .grade
            .map(|g| g.as_str())
            .unwrap_or("ungraded");

        let completion = card
            .factors
            .completion_rate
            .map(|r| format!("{:.0}% of assigned tasks completed", r * 100.0))
            .unwrap_or_else(|| "no completion data".to_string());

        let on_time = card
            .factors
            .on_time_rate
            .map(|r| format!("{:.0}% of deadlined work delivered on time", r * 100.0))
            .unwrap_or_else(|| "no deadline history".to_string());

        let trend_text = match trend {
            Trend::Improving => "trending upward over the last month",
            Trend::Declining => "trending downward over the last month",
            Trend::Stable => "holding steady over the last month",
            Trend::InsufficientData => "without enough history for a trend",
        };

        format!(
            "Performance score {score:.1} (grade {grade}) across {count} tasks: \
             {completion}, {on_time}, {trend_text}.",
            count = card.task_count
        )
    }
}

#[async_trait]
impl Narrator for TemplateNarrator {
    async fn explain(&self, card: &ScoreCard, trend: Trend) -> Result<String, NarrativeError> {
        Ok(Self::render(card, trend))
    }
}

/// Ask `narrator`; on any failure substitute the deterministic template text.
pub async fn explain_with_fallback(
    narrator: &dyn Narrator,
    card: &ScoreCard,
    trend: Trend,
) -> String {
    match narrator.explain(card, trend).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "narrator failed; using template explanation");
            TemplateNarrator::render(card, trend)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Grade, ScoreFactors};

    fn card() -> ScoreCard {
        ScoreCard {
            score: Some(85.8),
            grade: Some(Grade::A),
            factors: ScoreFactors {
                completion_rate: Some(0.9),
                on_time_rate: Some(0.85),
                avg_complexity: Some(4.0),
            },
            task_count: 20,
        }
    }

    struct FailingNarrator;

    #[async_trait]
    impl Narrator for FailingNarrator {
        async fn explain(&self, _: &ScoreCard, _: Trend) -> Result<String, NarrativeError> {
            Err(NarrativeError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn template_is_deterministic() {
        let a = TemplateNarrator::render(&card(), Trend::Improving);
        let b = TemplateNarrator::render(&card(), Trend::Improving);
        assert_eq!(a, b);
        assert!(a.contains("85.8"));
        assert!(a.contains("grade A"));
    }

    #[test]
    fn absent_score_gets_a_no_data_message() {
        let text = TemplateNarrator::render(&ScoreCard::empty(), Trend::InsufficientData);
        assert!(text.contains("No performance score yet"));
    }

    #[tokio::test]
    async fn fallback_substitutes_template_text_on_failure() {
        let text = explain_with_fallback(&FailingNarrator, &card(), Trend::Stable).await;
        assert_eq!(text, TemplateNarrator::render(&card(), Trend::Stable));
    }
}
