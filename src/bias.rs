//! Bias audit checklists
//!
//! Checklists are static enumerated data, not computation. Every evaluation
//! path attaches the same named checks, with notes overridden where the run
//! learned something specific (reference provided, winner flipped, panel
//! size).

use crate::types::BiasChecklistItem;
use std::collections::HashMap;

/// Checks attached to every single-response evaluation
pub const STANDARD_BIAS_CHECKS: &[&str] = &[
    "length_bias",
    "verbosity_bias",
    "style_bias",
    "anchoring_bias",
];

/// Checks attached to pairwise comparisons
pub const PAIRWISE_BIAS_CHECKS: &[&str] = &[
    "position_bias",
    "length_bias",
    "verbosity_bias",
    "style_bias",
];

/// Extra check appended when heterogeneous judge backends are aggregated
pub const CROSS_MODEL_CHECK: &str = "cross_model_bias";

/// Note recorded for a check with nothing specific to report
pub const DEFAULT_CHECK_NOTE: &str = "Evaluated during assessment";

/// Build a checklist from check names, overriding notes where supplied
pub fn build_checklist(checks: &[&str], notes: &HashMap<&str, String>) -> Vec<BiasChecklistItem> {
    checks
        .iter()
        .map(|check| BiasChecklistItem {
            name: check.to_string(),
            checked: true,
            notes: notes
                .get(check)
                .cloned()
                .unwrap_or_else(|| DEFAULT_CHECK_NOTE.to_string()),
        })
        .collect()
}
