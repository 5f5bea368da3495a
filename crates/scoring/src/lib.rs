//! `crewforge-scoring` — deterministic employee performance scoring.
//!
//! The engine is a pure function from a task-history snapshot to a score
//! card. Every invocation appends a new [`sample::PerformanceSample`] row
//! (handled by infra); prior rows are never updated, which is what makes
//! trend computation possible.

pub mod engine;
pub mod narrative;
pub mod sample;
pub mod trend;

pub use engine::{Grade, ScoreCard, ScoreFactors, ScoringEngine};
pub use narrative::{Narrator, NarrativeError, TemplateNarrator, explain_with_fallback};
pub use sample::PerformanceSample;
pub use trend::Trend;
