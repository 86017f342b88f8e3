//! Built-in evaluation rubrics
//!
//! Ready-made criterion sets for common review tasks. Every criterion
//! scores 0-2 with equal weight: 0 does not meet the bar, 1 partially
//! meets it, 2 fully meets it.

use crate::types::EvaluationCriterion;

/// Rubric for judging a code change end to end.
pub fn code_review_rubric() -> Vec<EvaluationCriterion> {
    vec![
        EvaluationCriterion::new(
            "Correctness",
            "The code correctly implements the required functionality. Logic is sound, edge cases are handled, and the code produces expected outputs for valid inputs.",
            (0, 2),
        ),
        EvaluationCriterion::new(
            "Completeness",
            "The implementation addresses all stated requirements. No required features are missing, and the solution is fully functional without TODO placeholders or incomplete sections.",
            (0, 2),
        ),
        EvaluationCriterion::new(
            "Code Quality",
            "The code follows best practices for readability and maintainability. Names are descriptive, functions are appropriately sized, and the code structure is clear and logical.",
            (0, 2),
        ),
        EvaluationCriterion::new(
            "Security",
            "The code avoids common security vulnerabilities. Inputs are validated, sensitive data is protected, and there are no injection risks or unsafe operations.",
            (0, 2),
        ),
        EvaluationCriterion::new(
            "Test Quality",
            "Tests are comprehensive, covering happy paths and edge cases. Test code is readable, tests are independent, and assertions are meaningful and specific.",
            (0, 2),
        ),
    ]
}

/// Rubric for judging a test suite on its own.
pub fn test_quality_rubric() -> Vec<EvaluationCriterion> {
    vec![
        EvaluationCriterion::new(
            "Coverage",
            "Tests exercise a comprehensive portion of the codebase. Critical paths, branches, and functions are covered. Coverage gaps in important areas are minimized.",
            (0, 2),
        ),
        EvaluationCriterion::new(
            "Edge Cases",
            "Tests include boundary conditions, empty inputs, null values, and other edge cases. Unusual but valid inputs are tested alongside typical use cases.",
            (0, 2),
        ),
        EvaluationCriterion::new(
            "Error Handling",
            "Tests verify that errors are handled gracefully. Expected exceptions are raised for invalid inputs, and error messages are meaningful and accurate.",
            (0, 2),
        ),
        EvaluationCriterion::new(
            "Naming",
            "Test names clearly describe what is being tested and expected outcomes. Names follow consistent conventions and make test failures immediately understandable without reading the test body.",
            (0, 2),
        ),
        EvaluationCriterion::new(
            "Isolation",
            "Tests are independent and can run in any order. Each test sets up its own state and cleans up after itself. Tests do not share mutable state or depend on external resources.",
            (0, 2),
        ),
    ]
}
