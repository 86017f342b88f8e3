//! Prompt construction for judge calls
//!
//! Two deterministic builders: single-response evaluation against a rubric,
//! and pairwise comparison. Identical inputs produce byte-identical prompts.

use crate::types::EvaluationCriterion;

/// Build the prompt for evaluating one response against a rubric.
///
/// When a reference answer is supplied it is included verbatim so the judge
/// can compare directly instead of judging open-ended.
pub fn build_evaluation_prompt(
    response: &str,
    rubric: &[EvaluationCriterion],
    reference: Option<&str>,
) -> String {
    let mut lines: Vec<String> = vec![
        "You are an expert evaluator. Evaluate the following response against the provided criteria.".to_string(),
        String::new(),
        "IMPORTANT INSTRUCTIONS:".to_string(),
        "1. You MUST provide reasoning BEFORE giving any score".to_string(),
        "2. Scores must be integers within the specified scale".to_string(),
        "3. If you detect any safety concerns, include 'Safety: CONCERN' in your response".to_string(),
        String::new(),
    ];

    if let Some(reference) = reference {
        lines.push("Reference Answer:".to_string());
        lines.push(reference.to_string());
        lines.push(String::new());
    }

    lines.push("Response to Evaluate:".to_string());
    lines.push(response.to_string());
    lines.push(String::new());

    lines.push("Evaluation Criteria:".to_string());
    for criterion in rubric {
        lines.push(format!(
            "- {}: {} (Scale: {} to {}, Weight: {})",
            criterion.name, criterion.description, criterion.scale.0, criterion.scale.1, criterion.weight
        ));
    }
    lines.push(String::new());

    lines.push("For each criterion, provide your evaluation in this format:".to_string());
    lines.push("Reasoning: [Your detailed reasoning]".to_string());
    lines.push("Score: [Integer score within scale]".to_string());
    lines.push(String::new());
    lines.push("Then provide an overall assessment.".to_string());

    lines.join("\n")
}

/// Build the prompt for comparing two responses.
///
/// Criteria are listed with their scales but without weights; weighting
/// is an aggregation concern and a comparison has no totals.
pub fn build_pairwise_prompt(
    response_a: &str,
    response_b: &str,
    rubric: &[EvaluationCriterion],
) -> String {
    let mut lines: Vec<String> = vec![
        "You are an expert evaluator. Compare the following two responses.".to_string(),
        String::new(),
        "IMPORTANT INSTRUCTIONS:".to_string(),
        "1. You MUST provide reasoning BEFORE declaring a winner".to_string(),
        "2. Consider each criterion carefully".to_string(),
        "3. Declare winner as 'Winner: A', 'Winner: B', or 'Winner: tie'".to_string(),
        String::new(),
        "Response A:".to_string(),
        response_a.to_string(),
        String::new(),
        "Response B:".to_string(),
        response_b.to_string(),
        String::new(),
        "Evaluation Criteria:".to_string(),
    ];

    for criterion in rubric {
        lines.push(format!(
            "- {}: {} (Scale: {} to {})",
            criterion.name, criterion.description, criterion.scale.0, criterion.scale.1
        ));
    }

    lines.push(String::new());
    lines.push("Provide your comparison:".to_string());
    lines.push("Reasoning: [Your detailed comparison]".to_string());
    lines.push("Winner: [A, B, or tie]".to_string());

    lines.join("\n")
}
