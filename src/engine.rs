//! LLM-as-judge evaluation engine
//!
//! Structured evaluation with bias mitigation:
//! - Rubric scoring with reasoning required before every score
//! - Pairwise comparison with position debiasing (swap and re-judge)
//! - Homogeneous ensembles with majority voting over rounded totals
//! - Heterogeneous multi-model ensembles tolerant of judge failure
//!
//! The engine performs no I/O of its own. Judges are injected and
//! invoked synchronously; aggregation state is local to each call.

use std::collections::HashMap;

use anyhow::Result;

use crate::bias::{build_checklist, CROSS_MODEL_CHECK, PAIRWISE_BIAS_CHECKS, STANDARD_BIAS_CHECKS};
use crate::parse::{parse_criterion_score, parse_safety_flag, parse_winner};
use crate::prompt::{build_evaluation_prompt, build_pairwise_prompt};
use crate::types::{
    BiasChecklistItem, CriterionScore, EvaluationCriterion, EvaluationReport, PairwiseResult,
    Winner,
};

/// Confidence when both pairwise orderings agree.
pub const STABLE_CONFIDENCE: f64 = 1.0;
/// Confidence when one ordering says tie and the other picks a winner.
pub const PARTIAL_AGREEMENT_CONFIDENCE: f64 = 0.5;
/// Confidence when the two orderings contradict each other outright.
pub const CONTRADICTION_CONFIDENCE: f64 = 0.3;
/// Prefix applied to report reasoning when a safety concern is detected.
pub const SAFETY_MARKER: &str = "[SAFETY CONCERN DETECTED] ";

/// A judge backend: takes a fully built prompt, returns the raw completion.
///
/// No structure is assumed beyond text in, text out. Implementations may
/// wrap an HTTP API, a subprocess, or a test stub; timeouts and retries
/// are the caller's concern.
pub trait Judge {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<F> Judge for F
where
    F: Fn(&str) -> Result<String>,
{
    fn complete(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

/// Tuning knobs for the evaluation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Characters of each trial's reasoning kept when combining ensemble scores.
    pub reasoning_excerpt_chars: usize,
    /// Weight of vote agreement in ensemble confidence.
    pub agreement_weight: f64,
    /// Weight of the variance factor in ensemble confidence.
    pub variance_weight: f64,
    /// Confidence ceiling once a safety concern is flagged.
    pub safety_confidence_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reasoning_excerpt_chars: 100,
            agreement_weight: 0.7,
            variance_weight: 0.3,
            safety_confidence_cap: 0.8,
        }
    }
}

/// Evaluation engine. Stateless between calls; cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct JudgeEngine {
    config: EngineConfig,
}

/// One usable ensemble trial: the criterion scores that parsed, plus
/// their weighted total.
struct JudgeTrial {
    scores: Vec<CriterionScore>,
    total: f64,
}

struct EnsembleAggregate {
    total: f64,
    confidence: f64,
    agreement_ratio: f64,
    scores: Vec<CriterionScore>,
}

impl JudgeEngine {
    /// Engine with default tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with explicit tuning.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Evaluate a response against a rubric with a single judge call.
    ///
    /// A criterion whose score cannot be parsed from the completion is
    /// dropped from aggregation rather than failing the evaluation.
    /// Supplying a reference answer anchors the judge to ground truth.
    pub fn evaluate(
        &self,
        judge: &dyn Judge,
        response: &str,
        rubric: &[EvaluationCriterion],
        reference: Option<&str>,
    ) -> Result<EvaluationReport> {
        let prompt = build_evaluation_prompt(response, rubric, reference);
        let completion = judge.complete(&prompt)?;

        let scores = parse_scores(&completion, rubric);
        let total = weighted_total(&scores);
        let safety_flag = parse_safety_flag(&completion);

        let reasoning = if safety_flag {
            format!("{}{}", SAFETY_MARKER, completion)
        } else {
            completion
        };
        let confidence = if safety_flag {
            self.config.safety_confidence_cap
        } else {
            1.0
        };

        let mut notes: HashMap<&str, String> = HashMap::new();
        if reference.is_some() {
            notes.insert("anchoring_bias", "Reference answer provided for comparison".to_string());
        }
        let bias_checklist = build_checklist(STANDARD_BIAS_CHECKS, &notes);

        Ok(EvaluationReport {
            scores,
            total,
            reasoning,
            bias_checklist,
            safety_flag,
            confidence,
        })
    }

    /// Compare two responses with position debiasing.
    ///
    /// The comparison runs twice, A-first then B-first, and the swapped
    /// verdict is translated back before reconciling. A verdict that
    /// flips with position is reported as an unstable low-confidence tie.
    pub fn pairwise_compare(
        &self,
        judge: &dyn Judge,
        response_a: &str,
        response_b: &str,
        rubric: &[EvaluationCriterion],
    ) -> Result<PairwiseResult> {
        let prompt = build_pairwise_prompt(response_a, response_b, rubric);
        let completion_original = judge.complete(&prompt)?;
        let winner_original = parse_winner(&completion_original);

        let prompt = build_pairwise_prompt(response_b, response_a, rubric);
        let completion_swapped = judge.complete(&prompt)?;
        let winner_swapped = parse_winner(&completion_swapped).swapped();

        let (winner, stable, confidence) = if winner_original == winner_swapped {
            (winner_original, true, STABLE_CONFIDENCE)
        } else if winner_original == Winner::Tie {
            (winner_swapped, false, PARTIAL_AGREEMENT_CONFIDENCE)
        } else if winner_swapped == Winner::Tie {
            (winner_original, false, PARTIAL_AGREEMENT_CONFIDENCE)
        } else {
            (Winner::Tie, false, CONTRADICTION_CONFIDENCE)
        };

        if !stable {
            tracing::warn!(
                "pairwise verdict unstable: {:?} then {:?} after position swap",
                winner_original,
                winner_swapped
            );
        }

        let mut notes: HashMap<&str, String> = HashMap::new();
        let position_note = if stable {
            "Consistent across positions"
        } else {
            "DETECTED: Winner changed when positions swapped"
        };
        notes.insert("position_bias", position_note.to_string());
        let bias_checklist = build_checklist(PAIRWISE_BIAS_CHECKS, &notes);

        Ok(PairwiseResult {
            winner,
            reasoning: format!("Original: {}\nSwapped: {}", completion_original, completion_swapped),
            stable,
            confidence,
            bias_checklist,
        })
    }

    /// Run the same judge several times and majority-vote the totals.
    ///
    /// A judge invocation error aborts the vote and propagates. A
    /// completion that parses no criteria at all is dropped from
    /// aggregation; if every completion is dropped, the report comes
    /// back with zero confidence instead of an error.
    pub fn ensemble_vote(
        &self,
        judge: &dyn Judge,
        response: &str,
        rubric: &[EvaluationCriterion],
        n_judges: usize,
    ) -> Result<EvaluationReport> {
        let prompt = build_evaluation_prompt(response, rubric, None);

        let mut trials: Vec<JudgeTrial> = Vec::new();
        let mut completions: Vec<String> = Vec::new();
        for _ in 0..n_judges {
            let completion = judge.complete(&prompt)?;
            let scores = parse_scores(&completion, rubric);
            if !scores.is_empty() {
                let total = weighted_total(&scores);
                trials.push(JudgeTrial { scores, total });
                completions.push(completion);
            }
        }

        if trials.is_empty() {
            return Ok(zero_confidence_report(
                "No valid evaluations from judges".to_string(),
                build_checklist(STANDARD_BIAS_CHECKS, &HashMap::new()),
            ));
        }

        let aggregate = self.aggregate_trials(&trials, rubric);
        let safety_flag = completions.iter().any(|c| parse_safety_flag(c));

        let mut notes: HashMap<&str, String> = HashMap::new();
        notes.insert("anchoring_bias", format!("Ensemble of {} judges used", n_judges));
        let bias_checklist = build_checklist(STANDARD_BIAS_CHECKS, &notes);

        Ok(EvaluationReport {
            scores: aggregate.scores,
            total: aggregate.total,
            reasoning: format!(
                "Ensemble of {} judges. Agreement: {:.0}%",
                n_judges,
                aggregate.agreement_ratio * 100.0
            ),
            bias_checklist,
            safety_flag,
            confidence: aggregate.confidence,
        })
    }

    /// Heterogeneous ensemble across distinct judge backends.
    ///
    /// Each judge is tried exactly once; a failing judge is excluded
    /// from the vote instead of aborting it. This never returns an
    /// error: total failure yields a zero-confidence report.
    pub fn multi_model_ensemble(
        &self,
        judges: &[&dyn Judge],
        response: &str,
        rubric: &[EvaluationCriterion],
    ) -> EvaluationReport {
        let prompt = build_evaluation_prompt(response, rubric, None);

        let mut completions: Vec<String> = Vec::new();
        for (index, judge) in judges.iter().enumerate() {
            match judge.complete(&prompt) {
                Ok(completion) => completions.push(completion),
                Err(err) => {
                    tracing::warn!("judge {} failed, excluding from vote: {}", index, err)
                }
            }
        }
        let succeeded = completions.len();

        let mut trials: Vec<JudgeTrial> = Vec::new();
        for completion in &completions {
            let scores = parse_scores(completion, rubric);
            if !scores.is_empty() {
                let total = weighted_total(&scores);
                trials.push(JudgeTrial { scores, total });
            }
        }

        let mut checks = STANDARD_BIAS_CHECKS.to_vec();
        checks.push(CROSS_MODEL_CHECK);

        if trials.is_empty() {
            return zero_confidence_report(
                format!(
                    "Multi-model ensemble: {}/{} judges succeeded. No valid evaluations from judges",
                    succeeded,
                    judges.len()
                ),
                build_checklist(&checks, &HashMap::new()),
            );
        }

        let aggregate = self.aggregate_trials(&trials, rubric);
        // Safety markers count even from completions that parsed no scores.
        let safety_flag = completions.iter().any(|c| parse_safety_flag(c));

        let mut notes: HashMap<&str, String> = HashMap::new();
        notes.insert("anchoring_bias", format!("Ensemble of {} judge models used", judges.len()));
        notes.insert("cross_model_bias", format!("{} different judge models used", judges.len()));
        let bias_checklist = build_checklist(&checks, &notes);

        EvaluationReport {
            scores: aggregate.scores,
            total: aggregate.total,
            reasoning: format!(
                "Multi-model ensemble: {}/{} judges succeeded. Agreement: {:.0}%",
                succeeded,
                judges.len(),
                aggregate.agreement_ratio * 100.0
            ),
            bias_checklist,
            safety_flag,
            confidence: aggregate.confidence,
        }
    }

    /// Majority-vote the rounded trial totals and blend agreement with
    /// a variance factor for confidence.
    fn aggregate_trials(&self, trials: &[JudgeTrial], rubric: &[EvaluationCriterion]) -> EnsembleAggregate {
        let totals: Vec<f64> = trials.iter().map(|t| t.total).collect();
        let rounded: Vec<i64> = totals.iter().map(|t| t.round() as i64).collect();
        let (majority_total, majority_count) = majority_vote(&rounded);
        let agreement_ratio = majority_count as f64 / totals.len() as f64;

        let variance_factor = if totals.len() > 1 {
            let variance = sample_variance(&totals);
            let max_possible = rubric
                .first()
                .map(|c| {
                    let range = (c.scale.1 - c.scale.0) as f64;
                    range * range / 4.0
                })
                .unwrap_or(4.0);
            1.0 - (variance / max_possible).min(1.0)
        } else {
            1.0
        };

        let confidence = agreement_ratio * self.config.agreement_weight
            + variance_factor * self.config.variance_weight;

        EnsembleAggregate {
            total: majority_total as f64,
            confidence,
            agreement_ratio,
            scores: self.combine_criterion_scores(trials, rubric),
        }
    }

    /// Combine per-trial scores criterion by criterion: median score,
    /// reasoning excerpts joined in trial order. At most one score per
    /// trial counts for each criterion.
    fn combine_criterion_scores(
        &self,
        trials: &[JudgeTrial],
        rubric: &[EvaluationCriterion],
    ) -> Vec<CriterionScore> {
        let mut combined = Vec::new();
        for criterion in rubric {
            let matching: Vec<&CriterionScore> = trials
                .iter()
                .filter_map(|t| t.scores.iter().find(|s| s.criterion.name == criterion.name))
                .collect();
            if matching.is_empty() {
                continue;
            }

            let median = integer_median(matching.iter().map(|s| s.score).collect());
            let reasoning = matching
                .iter()
                .map(|s| {
                    s.reasoning
                        .chars()
                        .take(self.config.reasoning_excerpt_chars)
                        .collect::<String>()
                })
                .collect::<Vec<_>>()
                .join(" | ");

            combined.push(CriterionScore {
                criterion: criterion.clone(),
                score: median,
                reasoning,
            });
        }
        combined
    }
}

/// Parse every criterion from one completion, dropping the ones that fail.
fn parse_scores(completion: &str, rubric: &[EvaluationCriterion]) -> Vec<CriterionScore> {
    let mut scores = Vec::new();
    for criterion in rubric {
        match parse_criterion_score(completion, criterion) {
            Ok(score) => scores.push(score),
            Err(err) => {
                tracing::debug!("dropping score for criterion '{}': {}", criterion.name, err)
            }
        }
    }
    scores
}

/// Weighted mean of criterion scores; 0.0 when nothing parsed.
fn weighted_total(scores: &[CriterionScore]) -> f64 {
    let total_weight: f64 = scores.iter().map(|s| s.criterion.weight).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    let weighted_sum: f64 = scores.iter().map(|s| s.score as f64 * s.criterion.weight).sum();
    weighted_sum / total_weight
}

/// Median of integer scores. An even count takes the midpoint of the
/// middle pair, truncated toward zero.
fn integer_median(mut scores: Vec<i64>) -> i64 {
    scores.sort_unstable();
    let mid = scores.len() / 2;
    if scores.len() % 2 == 1 {
        scores[mid]
    } else {
        (scores[mid - 1] + scores[mid]) / 2
    }
}

/// Most frequent value and its count. Ties keep the value seen first.
fn majority_vote(values: &[i64]) -> (i64, usize) {
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for &value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best = counts[0];
    for &entry in &counts[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    best
}

/// Sample variance with the n-1 denominator. Callers guard len > 1.
fn sample_variance(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

fn zero_confidence_report(reasoning: String, bias_checklist: Vec<BiasChecklistItem>) -> EvaluationReport {
    EvaluationReport {
        scores: Vec::new(),
        total: 0.0,
        reasoning,
        bias_checklist,
        safety_flag: false,
        confidence: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::{Cell, RefCell};

    fn accuracy_rubric() -> Vec<EvaluationCriterion> {
        vec![EvaluationCriterion::new("accuracy", "Is the response correct?", (1, 5))]
    }

    fn scoring_judge(score: i64) -> impl Fn(&str) -> Result<String> {
        move |_: &str| Ok(format!("Reasoning: looks reasonable\nScore: {}", score))
    }

    #[test]
    fn test_evaluate_single_criterion() {
        let engine = JudgeEngine::new();
        let judge = |_: &str| -> Result<String> { Ok("Reasoning: fine\nScore: 4".to_string()) };

        let report = engine.evaluate(&judge, "the answer", &accuracy_rubric(), None).unwrap();

        assert_eq!(report.total, 4.0);
        assert_eq!(report.scores.len(), 1);
        assert_eq!(report.scores[0].score, 4);
        assert_eq!(report.scores[0].criterion.name, "accuracy");
        assert_eq!(report.confidence, 1.0);
        assert!(!report.safety_flag);
    }

    #[test]
    fn test_evaluate_drops_out_of_range_criterion() {
        let engine = JudgeEngine::new();
        let rubric = vec![
            EvaluationCriterion::new("accuracy", "Is the response correct?", (1, 5)),
            EvaluationCriterion::new("strictness", "How strict is it?", (0, 2)),
        ];
        let judge = |_: &str| -> Result<String> { Ok("Reasoning: ok\nScore: 4".to_string()) };

        let report = engine.evaluate(&judge, "the answer", &rubric, None).unwrap();

        assert_eq!(report.scores.len(), 1);
        assert_eq!(report.scores[0].criterion.name, "accuracy");
        assert_eq!(report.total, 4.0);
    }

    #[test]
    fn test_evaluate_unparseable_completion_scores_zero() {
        let engine = JudgeEngine::new();
        let judge = |_: &str| -> Result<String> { Ok("I refuse to follow the format".to_string()) };

        let report = engine.evaluate(&judge, "the answer", &accuracy_rubric(), None).unwrap();

        assert!(report.scores.is_empty());
        assert_eq!(report.total, 0.0);
        assert_eq!(report.confidence, 1.0);
    }

    #[test]
    fn test_evaluate_passes_reference_to_judge() {
        let engine = JudgeEngine::new();
        let prompts: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let judge = |prompt: &str| -> Result<String> {
            prompts.borrow_mut().push(prompt.to_string());
            Ok("Reasoning: matches the reference\nScore: 5".to_string())
        };

        engine
            .evaluate(&judge, "the answer", &accuracy_rubric(), Some("ground truth"))
            .unwrap();

        let seen = prompts.borrow();
        assert!(seen[0].contains("Reference Answer:\nground truth"));
    }

    #[test]
    fn test_evaluate_safety_concern_marks_report() {
        let engine = JudgeEngine::new();
        let judge = |_: &str| -> Result<String> {
            Ok("Reasoning: this is potentially harmful advice\nScore: 1".to_string())
        };

        let report = engine.evaluate(&judge, "the answer", &accuracy_rubric(), None).unwrap();

        assert!(report.safety_flag);
        assert!(report.reasoning.starts_with(SAFETY_MARKER));
        assert_eq!(report.confidence, 0.8);
    }

    #[test]
    fn test_evaluate_anchoring_note_tracks_reference() {
        let engine = JudgeEngine::new();
        let judge = scoring_judge(3);

        let with_reference = engine
            .evaluate(&judge, "answer", &accuracy_rubric(), Some("truth"))
            .unwrap();
        let anchoring = with_reference
            .bias_checklist
            .iter()
            .find(|item| item.name == "anchoring_bias")
            .unwrap();
        assert_eq!(anchoring.notes, "Reference answer provided for comparison");

        let without_reference = engine.evaluate(&judge, "answer", &accuracy_rubric(), None).unwrap();
        let anchoring = without_reference
            .bias_checklist
            .iter()
            .find(|item| item.name == "anchoring_bias")
            .unwrap();
        assert_eq!(anchoring.notes, "Evaluated during assessment");
    }

    #[test]
    fn test_evaluate_propagates_judge_error() {
        let engine = JudgeEngine::new();
        let judge = |_: &str| -> Result<String> { Err(anyhow!("backend unavailable")) };

        let result = engine.evaluate(&judge, "the answer", &accuracy_rubric(), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_pairwise_content_tracking_judge_is_stable() {
        let engine = JudgeEngine::new();
        // Prefers the response containing "thorough" wherever it appears.
        let judge = |prompt: &str| -> Result<String> {
            let thorough_at = prompt.find("thorough answer").unwrap();
            let terse_at = prompt.find("terse answer").unwrap();
            let winner = if thorough_at < terse_at { "A" } else { "B" };
            Ok(format!("Reasoning: depth wins\nWinner: {}", winner))
        };

        let result = engine
            .pairwise_compare(&judge, "thorough answer", "terse answer", &accuracy_rubric())
            .unwrap();

        assert_eq!(result.winner, Winner::A);
        assert!(result.stable);
        assert_eq!(result.confidence, 1.0);
        let position = result
            .bias_checklist
            .iter()
            .find(|item| item.name == "position_bias")
            .unwrap();
        assert_eq!(position.notes, "Consistent across positions");
    }

    #[test]
    fn test_pairwise_position_biased_judge_yields_tie() {
        let engine = JudgeEngine::new();
        let judge = |_: &str| -> Result<String> { Ok("Reasoning: first looks best\nWinner: A".to_string()) };

        let result = engine
            .pairwise_compare(&judge, "left", "right", &accuracy_rubric())
            .unwrap();

        assert_eq!(result.winner, Winner::Tie);
        assert!(!result.stable);
        assert_eq!(result.confidence, CONTRADICTION_CONFIDENCE);
        let position = result
            .bias_checklist
            .iter()
            .find(|item| item.name == "position_bias")
            .unwrap();
        assert_eq!(position.notes, "DETECTED: Winner changed when positions swapped");
    }

    #[test]
    fn test_pairwise_single_tie_defers_to_decisive_pass() {
        let engine = JudgeEngine::new();
        let calls = Cell::new(0usize);
        let judge = |_: &str| -> Result<String> {
            let call = calls.get();
            calls.set(call + 1);
            if call == 0 {
                Ok("Reasoning: too close\nWinner: tie".to_string())
            } else {
                Ok("Reasoning: clearer on reflection\nWinner: A".to_string())
            }
        };

        let result = engine
            .pairwise_compare(&judge, "left", "right", &accuracy_rubric())
            .unwrap();

        // Swapped-pass "A" translates back to B.
        assert_eq!(result.winner, Winner::B);
        assert!(!result.stable);
        assert_eq!(result.confidence, PARTIAL_AGREEMENT_CONFIDENCE);
    }

    #[test]
    fn test_pairwise_swaps_positions_on_second_call() {
        let engine = JudgeEngine::new();
        let prompts: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let judge = |prompt: &str| -> Result<String> {
            prompts.borrow_mut().push(prompt.to_string());
            Ok("Reasoning: close call\nWinner: tie".to_string())
        };

        engine
            .pairwise_compare(&judge, "first text", "second text", &accuracy_rubric())
            .unwrap();

        let seen = prompts.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].contains("Response A:\nfirst text"));
        assert!(seen[0].contains("Response B:\nsecond text"));
        assert!(seen[1].contains("Response A:\nsecond text"));
        assert!(seen[1].contains("Response B:\nfirst text"));
    }

    #[test]
    fn test_pairwise_reasoning_records_both_passes() {
        let engine = JudgeEngine::new();
        let judge = |_: &str| -> Result<String> { Ok("Reasoning: even\nWinner: tie".to_string()) };

        let result = engine
            .pairwise_compare(&judge, "left", "right", &accuracy_rubric())
            .unwrap();

        assert!(result.reasoning.contains("Original: "));
        assert!(result.reasoning.contains("Swapped: "));
    }

    #[test]
    fn test_ensemble_full_agreement() {
        let engine = JudgeEngine::new();
        let judge = scoring_judge(5);

        let report = engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3)
            .unwrap();

        assert_eq!(report.total, 5.0);
        assert!(report.confidence >= 0.9);
        assert_eq!(report.reasoning, "Ensemble of 3 judges. Agreement: 100%");
        assert_eq!(report.scores.len(), 1);
        assert_eq!(report.scores[0].score, 5);
    }

    #[test]
    fn test_ensemble_majority_vote_on_split() {
        let engine = JudgeEngine::new();
        let calls = Cell::new(0usize);
        let outputs = [
            "Reasoning: strong\nScore: 4",
            "Reasoning: strong\nScore: 4",
            "Reasoning: weak\nScore: 2",
        ];
        let judge = |_: &str| -> Result<String> {
            let call = calls.get();
            calls.set(call + 1);
            Ok(outputs[call].to_string())
        };

        let report = engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3)
            .unwrap();

        assert_eq!(report.total, 4.0);
        // agreement 2/3 weighted 0.7, variance factor 2/3 weighted 0.3
        assert!((report.confidence - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.reasoning, "Ensemble of 3 judges. Agreement: 67%");
    }

    #[test]
    fn test_ensemble_vote_tie_keeps_first_total() {
        let engine = JudgeEngine::new();
        let calls = Cell::new(0usize);
        let outputs = [
            "Reasoning: poor\nScore: 1",
            "Reasoning: fair\nScore: 3",
            "Reasoning: great\nScore: 5",
        ];
        let judge = |_: &str| -> Result<String> {
            let call = calls.get();
            calls.set(call + 1);
            Ok(outputs[call].to_string())
        };

        let report = engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3)
            .unwrap();

        assert_eq!(report.total, 1.0);
        assert!(report.confidence < 0.7);
    }

    #[test]
    fn test_ensemble_median_combines_scores() {
        let engine = JudgeEngine::new();
        let calls = Cell::new(0usize);
        let outputs = [
            "Reasoning: first judge\nScore: 4",
            "Reasoning: second judge\nScore: 3",
            "Reasoning: third judge\nScore: 4",
        ];
        let judge = |_: &str| -> Result<String> {
            let call = calls.get();
            calls.set(call + 1);
            Ok(outputs[call].to_string())
        };

        let report = engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3)
            .unwrap();

        assert_eq!(report.scores.len(), 1);
        assert_eq!(report.scores[0].score, 4);
        let combined = &report.scores[0].reasoning;
        assert!(combined.contains("first judge"));
        assert!(combined.contains("second judge"));
        assert!(combined.contains("third judge"));
        assert_eq!(combined.matches(" | ").count(), 2);
    }

    #[test]
    fn test_ensemble_truncates_reasoning_excerpts() {
        let engine = JudgeEngine::new();
        let long_reasoning = "x".repeat(150);
        let judge = move |_: &str| -> Result<String> {
            Ok(format!("Reasoning: {}\nScore: 4", long_reasoning))
        };

        let report = engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3)
            .unwrap();

        // 100 chars per excerpt, three excerpts, two separators
        assert_eq!(report.scores[0].reasoning.len(), 306);
    }

    #[test]
    fn test_ensemble_drops_unparseable_trials() {
        let engine = JudgeEngine::new();
        let calls = Cell::new(0usize);
        let outputs = [
            "Reasoning: solid\nScore: 4",
            "no usable format here",
            "Reasoning: solid\nScore: 4",
        ];
        let judge = |_: &str| -> Result<String> {
            let call = calls.get();
            calls.set(call + 1);
            Ok(outputs[call].to_string())
        };

        let report = engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3)
            .unwrap();

        assert_eq!(report.total, 4.0);
        assert_eq!(report.confidence, 1.0);
    }

    #[test]
    fn test_ensemble_all_unparseable_yields_zero_confidence() {
        let engine = JudgeEngine::new();
        let judge = |_: &str| -> Result<String> { Ok("still not following the format".to_string()) };

        let report = engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3)
            .unwrap();

        assert!(report.scores.is_empty());
        assert_eq!(report.total, 0.0);
        assert_eq!(report.confidence, 0.0);
        assert_eq!(report.reasoning, "No valid evaluations from judges");
        assert!(!report.safety_flag);
    }

    #[test]
    fn test_ensemble_propagates_judge_error() {
        let engine = JudgeEngine::new();
        let calls = Cell::new(0usize);
        let judge = |_: &str| -> Result<String> {
            let call = calls.get();
            calls.set(call + 1);
            if call == 1 {
                Err(anyhow!("rate limited"))
            } else {
                Ok("Reasoning: fine\nScore: 4".to_string())
            }
        };

        let result = engine.ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3);
        assert!(result.is_err());
    }

    #[test]
    fn test_ensemble_builds_prompt_once_without_reference() {
        let engine = JudgeEngine::new();
        let prompts: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let judge = |prompt: &str| -> Result<String> {
            prompts.borrow_mut().push(prompt.to_string());
            Ok("Reasoning: fine\nScore: 4".to_string())
        };

        engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3)
            .unwrap();

        let seen = prompts.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], seen[1]);
        assert_eq!(seen[1], seen[2]);
        assert!(!seen[0].contains("Reference Answer:"));
    }

    #[test]
    fn test_ensemble_safety_flag_from_any_trial() {
        let engine = JudgeEngine::new();
        let calls = Cell::new(0usize);
        let outputs = [
            "Reasoning: fine\nScore: 5",
            "Reasoning: fine\nScore: 5\nSafety: CONCERN",
            "Reasoning: fine\nScore: 5",
        ];
        let judge = |_: &str| -> Result<String> {
            let call = calls.get();
            calls.set(call + 1);
            Ok(outputs[call].to_string())
        };

        let report = engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 3)
            .unwrap();

        assert!(report.safety_flag);
        // Ensemble reasoning is a summary line; no marker prefix, no cap.
        assert_eq!(report.reasoning, "Ensemble of 3 judges. Agreement: 100%");
        assert_eq!(report.confidence, 1.0);
    }

    #[test]
    fn test_ensemble_checklist_notes_judge_count() {
        let engine = JudgeEngine::new();
        let judge = scoring_judge(4);

        let report = engine
            .ensemble_vote(&judge, "the answer", &accuracy_rubric(), 5)
            .unwrap();

        let names: Vec<&str> = report.bias_checklist.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, STANDARD_BIAS_CHECKS);
        let anchoring = report
            .bias_checklist
            .iter()
            .find(|item| item.name == "anchoring_bias")
            .unwrap();
        assert_eq!(anchoring.notes, "Ensemble of 5 judges used");
    }

    #[test]
    fn test_multi_model_majority_and_median() {
        let engine = JudgeEngine::new();
        let a = scoring_judge(4);
        let b = scoring_judge(3);
        let c = scoring_judge(4);
        let judges: Vec<&dyn Judge> = vec![&a, &b, &c];

        let report = engine.multi_model_ensemble(&judges, "the answer", &accuracy_rubric());

        assert!(report.reasoning.contains("3/3"));
        assert!(report.confidence > 0.0);
        assert_eq!(report.total, 4.0);
        assert_eq!(report.scores.len(), 1);
        assert_eq!(report.scores[0].score, 4);
    }

    #[test]
    fn test_multi_model_excludes_failing_judge() {
        let engine = JudgeEngine::new();
        let a = scoring_judge(4);
        let b = |_: &str| -> Result<String> { Err(anyhow!("model offline")) };
        let c = scoring_judge(4);
        let judges: Vec<&dyn Judge> = vec![&a, &b, &c];

        let report = engine.multi_model_ensemble(&judges, "the answer", &accuracy_rubric());

        assert!(report.reasoning.contains("2/3"));
        assert!(report.confidence > 0.0);
        assert_eq!(report.total, 4.0);
    }

    #[test]
    fn test_multi_model_all_failing_never_errors() {
        let engine = JudgeEngine::new();
        let a = |_: &str| -> Result<String> { Err(anyhow!("down")) };
        let b = |_: &str| -> Result<String> { Err(anyhow!("down")) };
        let c = |_: &str| -> Result<String> { Err(anyhow!("down")) };
        let judges: Vec<&dyn Judge> = vec![&a, &b, &c];

        let report = engine.multi_model_ensemble(&judges, "the answer", &accuracy_rubric());

        assert_eq!(report.confidence, 0.0);
        assert_eq!(report.total, 0.0);
        assert!(report.scores.is_empty());
        assert!(report.reasoning.contains("0/3"));
    }

    #[test]
    fn test_multi_model_full_agreement() {
        let engine = JudgeEngine::new();
        let a = scoring_judge(5);
        let b = scoring_judge(5);
        let c = scoring_judge(5);
        let judges: Vec<&dyn Judge> = vec![&a, &b, &c];

        let report = engine.multi_model_ensemble(&judges, "the answer", &accuracy_rubric());

        assert!(report.reasoning.contains("Agreement: 100%"));
        assert!(report.confidence >= 0.9);
        assert_eq!(report.total, 5.0);
    }

    #[test]
    fn test_multi_model_checklist_has_one_cross_model_entry() {
        let engine = JudgeEngine::new();
        let only = scoring_judge(4);
        let judges: Vec<&dyn Judge> = vec![&only];

        let report = engine.multi_model_ensemble(&judges, "the answer", &accuracy_rubric());

        let cross: Vec<_> = report
            .bias_checklist
            .iter()
            .filter(|item| item.name == CROSS_MODEL_CHECK)
            .collect();
        assert_eq!(cross.len(), 1);
        assert!(cross[0].checked);
    }

    #[test]
    fn test_multi_model_counts_unparseable_as_succeeded() {
        let engine = JudgeEngine::new();
        let a = |_: &str| -> Result<String> { Ok("potentially harmful rambling".to_string()) };
        let b = scoring_judge(3);
        let judges: Vec<&dyn Judge> = vec![&a, &b];

        let report = engine.multi_model_ensemble(&judges, "the answer", &accuracy_rubric());

        assert!(report.reasoning.contains("2/2"));
        assert_eq!(report.total, 3.0);
        // The unparseable completion still carried a safety marker.
        assert!(report.safety_flag);
    }

    #[test]
    fn test_weighted_total_respects_weights() {
        let make = |weight: f64, score: i64| CriterionScore {
            criterion: EvaluationCriterion::new("c", "d", (1, 5)).with_weight(weight),
            score,
            reasoning: "r".to_string(),
        };

        let even = vec![make(1.0, 4), make(1.0, 2)];
        assert_eq!(weighted_total(&even), 3.0);

        let skewed = vec![make(1.0, 4), make(3.0, 2)];
        assert_eq!(weighted_total(&skewed), 2.5);

        assert_eq!(weighted_total(&[]), 0.0);
    }

    #[test]
    fn test_integer_median() {
        assert_eq!(integer_median(vec![3]), 3);
        assert_eq!(integer_median(vec![1, 5, 3]), 3);
        assert_eq!(integer_median(vec![3, 4]), 3);
        assert_eq!(integer_median(vec![2, 4]), 3);
        assert_eq!(integer_median(vec![4, 3, 4]), 4);
    }

    #[test]
    fn test_majority_vote_prefers_first_on_tie() {
        assert_eq!(majority_vote(&[4, 4, 2]), (4, 2));
        assert_eq!(majority_vote(&[1, 3, 5]), (1, 1));
        assert_eq!(majority_vote(&[2, 4, 4, 2]), (2, 2));
    }

    #[test]
    fn test_sample_variance() {
        assert_eq!(sample_variance(&[1.0, 3.0, 5.0]), 4.0);
        assert_eq!(sample_variance(&[4.0, 4.0]), 0.0);
    }
}
