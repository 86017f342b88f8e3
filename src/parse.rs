//! Judge response parsing
//!
//! Extracts structured results from free-text judge completions:
//! - Criterion scores, with reasoning required before the score
//! - Pairwise winner declarations
//! - Safety concern markers

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;
use crate::types::{CriterionScore, EvaluationCriterion, Winner};

lazy_static! {
    static ref REASONING_LABEL: Regex = Regex::new(r"[Rr]easoning:").unwrap();
    static ref SCORE_LABEL: Regex = Regex::new(r"[Ss]core:").unwrap();
    static ref SCORE_VALUE: Regex = Regex::new(r"[Ss]core:\s*([\d.]+)").unwrap();
    static ref WINNER_LABEL: Regex = Regex::new(r"(?i)winner:\s*(a|b|tie)").unwrap();
    static ref SAFETY_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)safety:\s*concern").unwrap(),
        Regex::new(r"(?i)safety\s+concern").unwrap(),
        Regex::new(r"(?i)potentially\s+harmful").unwrap(),
        Regex::new(r"(?i)safety\s+issue").unwrap(),
    ];
}

/// Parse one criterion's score from a judge completion.
///
/// The completion must contain a `Reasoning:` label with non-empty text,
/// followed by a `Score:` label with an integer inside the criterion's
/// scale. Scores appearing before the reasoning do not count.
pub fn parse_criterion_score(
    text: &str,
    criterion: &EvaluationCriterion,
) -> Result<CriterionScore, ValidationError> {
    let reasoning_label = REASONING_LABEL.find(text).ok_or(ValidationError::ReasoningMissing)?;
    let tail = &text[reasoning_label.end()..];

    let score_label = SCORE_LABEL.find(tail);
    let reasoning_end = score_label.as_ref().map(|m| m.start()).unwrap_or(tail.len());
    let reasoning = tail[..reasoning_end].trim();
    if reasoning.is_empty() {
        return Err(ValidationError::EmptyReasoning);
    }

    let score_label = score_label.ok_or(ValidationError::ScoreMissing)?;
    let raw = SCORE_VALUE
        .captures(&tail[score_label.start()..])
        .ok_or(ValidationError::ScoreMissing)?
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or_default();

    let score = parse_integer_score(raw)?;

    let (min, max) = criterion.scale;
    if score < min || score > max {
        return Err(ValidationError::ScoreOutOfRange { score, min, max });
    }

    Ok(CriterionScore {
        criterion: criterion.clone(),
        score,
        reasoning: reasoning.to_string(),
    })
}

/// Judges sometimes write "4.0"; accept that, reject genuine fractions.
fn parse_integer_score(raw: &str) -> Result<i64, ValidationError> {
    if raw.contains('.') {
        let value: f64 = raw.parse().map_err(|_| ValidationError::NonIntegerScore {
            raw: raw.to_string(),
        })?;
        if value.fract() != 0.0 {
            return Err(ValidationError::NonIntegerScore {
                raw: raw.to_string(),
            });
        }
        Ok(value as i64)
    } else {
        raw.parse().map_err(|_| ValidationError::NonIntegerScore {
            raw: raw.to_string(),
        })
    }
}

/// Parse a pairwise winner declaration. Missing or unrecognized
/// declarations fall back to a tie rather than failing the comparison.
pub fn parse_winner(text: &str) -> Winner {
    match WINNER_LABEL.captures(text) {
        Some(caps) => match caps.get(1).map(|m| m.as_str().to_lowercase()).as_deref() {
            Some("a") => Winner::A,
            Some("b") => Winner::B,
            _ => Winner::Tie,
        },
        None => Winner::Tie,
    }
}

/// True when the completion contains any safety concern marker.
pub fn parse_safety_flag(text: &str) -> bool {
    SAFETY_PATTERNS.iter().any(|pattern| pattern.is_match(text))
}
