//! tribunal - LLM-as-judge evaluation harness
//!
//! Structured evaluation of model responses with explicit bias
//! mitigation, plus the deterministic plumbing around it:
//!
//! - **Rubric scoring**: criterion-by-criterion judging with reasoning
//!   required before every score
//! - **Pairwise comparison**: position debiasing via a swapped re-trial
//! - **Ensembles**: homogeneous majority voting, and heterogeneous
//!   multi-model panels tolerant of individual judge failure
//! - **Task routing**: deterministic classification of work items into
//!   agent sequences
//! - **Usage ledger**: append-only JSONL token accounting with a static
//!   pricing table
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tribunal::{code_review_rubric, JudgeEngine};
//!
//! let engine = JudgeEngine::new();
//! let judge = |prompt: &str| call_your_model(prompt);
//!
//! // Score one response against a rubric
//! let report = engine.evaluate(&judge, &diff_text, &code_review_rubric(), None)?;
//! println!("total {} confidence {}", report.total, report.confidence);
//!
//! // Position-debiased comparison of two candidates
//! let result = engine.pairwise_compare(&judge, &candidate_a, &candidate_b, &code_review_rubric())?;
//!
//! // Majority vote across repeated trials
//! let report = engine.ensemble_vote(&judge, &diff_text, &code_review_rubric(), 3)?;
//! ```

pub mod bias;
pub mod cost;
pub mod engine;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod router;
pub mod rubrics;
pub mod types;

// Evaluation engine
pub use engine::{EngineConfig, Judge, JudgeEngine, SAFETY_MARKER};
pub use error::ValidationError;
pub use types::*;

// Built-in rubrics
pub use rubrics::{code_review_rubric, test_quality_rubric};

// Task routing
pub use router::{Priority, RoutingContext, RoutingDecision, TaskRouter, TaskType};

// Usage ledger
pub use cost::{estimate_cost, summarize_by_day, DailySummary, UsageFilter, UsageRecord, UsageStore};
