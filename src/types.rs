//! Core types for rubric-based judge evaluation
//!
//! Everything a verdict is made of:
//! - Rubric criteria with integer scales and weights
//! - Per-criterion validated scores
//! - Reports carrying a bias audit trail and a confidence estimate
//! - Pairwise winners with stability tracking

use serde::{Deserialize, Serialize};

/// A criterion for evaluation with name, description, scale, and weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriterion {
    /// Short identifier (e.g. "accuracy")
    pub name: String,
    /// Full description of what to evaluate
    pub description: String,
    /// (min, max) valid integer scores, both inclusive
    pub scale: (i64, i64),
    /// Relative weight for aggregation
    pub weight: f64,
}

impl EvaluationCriterion {
    /// New criterion with the default weight of 1.0
    pub fn new(name: &str, description: &str, scale: (i64, i64)) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            scale,
            weight: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Largest weighted contribution this criterion can make to a total
    pub fn max_score(&self) -> f64 {
        self.scale.1 as f64 * self.weight
    }

    /// Smallest weighted contribution this criterion can make to a total
    pub fn min_score(&self) -> f64 {
        self.scale.0 as f64 * self.weight
    }
}

/// A validated score for a single criterion with its reasoning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionScore {
    /// The criterion being scored
    pub criterion: EvaluationCriterion,
    /// Integer score within the criterion's scale
    pub score: i64,
    /// Explanation written before the score was given
    pub reasoning: String,
}

/// An item in the bias checklist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasChecklistItem {
    /// Name of the bias check (e.g. "position_bias")
    pub name: String,
    /// Whether this check was performed
    pub checked: bool,
    /// Notes about the check result
    pub notes: String,
}

/// Complete evaluation report with scores, reasoning, and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub scores: Vec<CriterionScore>,
    /// Weighted average over the criteria that validated; 0.0 if none did
    pub total: f64,
    pub reasoning: String,
    pub bias_checklist: Vec<BiasChecklistItem>,
    /// Whether safety concerns were detected in any judge completion
    pub safety_flag: bool,
    /// Confidence in the evaluation (0.0 to 1.0)
    pub confidence: f64,
}

/// Verdict of a pairwise comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "tie")]
    Tie,
}

impl Winner {
    /// The same verdict as seen from swapped positions
    pub fn swapped(&self) -> Winner {
        match self {
            Winner::A => Winner::B,
            Winner::B => Winner::A,
            Winner::Tie => Winner::Tie,
        }
    }
}

/// Result of a position-debiased pairwise comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseResult {
    pub winner: Winner,
    /// Both raw judge completions, labeled by trial
    pub reasoning: String,
    /// Whether the verdict was consistent across position swaps
    pub stable: bool,
    /// Confidence in the result (lower if unstable)
    pub confidence: f64,
    pub bias_checklist: Vec<BiasChecklistItem>,
}
