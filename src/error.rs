//! Validation errors for judge response parsing.

use thiserror::Error;

/// Ways a judge completion can fail validation for a single criterion.
///
/// The engine catches these and drops the criterion from the report; they
/// are typed so callers running the parser directly can match on the
/// failure mode.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// No `Reasoning:` label found anywhere in the completion.
    #[error("reasoning is required before score, expected 'Reasoning: ...' before 'Score: ...'")]
    ReasoningMissing,

    /// A `Reasoning:` label was found but the segment before the score is blank.
    #[error("reasoning is required before score and cannot be empty")]
    EmptyReasoning,

    /// No `Score: N` found after the reasoning segment.
    #[error("no score found after reasoning, expected 'Score: N'")]
    ScoreMissing,

    /// The score token was not an integer. Partial scores are not allowed.
    #[error("score must be an integer, got '{raw}'")]
    NonIntegerScore { raw: String },

    /// The integer score fell outside the criterion's declared scale.
    #[error("score {score} is outside valid range [{min}, {max}]")]
    ScoreOutOfRange { score: i64, min: i64, max: i64 },
}
