//! Tool adapter implementations
//!
//! One adapter per RCM domain concern. Reasoning-backed adapters share the
//! same discipline: render a prompt, call the reasoning collaborator, pull
//! the first JSON object out of the completion, and report raw confidence
//! signals for the evaluator to score. Rules-backed adapters never touch the
//! reasoning collaborator at all.

mod claims;
mod coding;
mod denial;
mod eligibility;
mod parse;
mod patient;
pub mod prompts;
pub mod records;
mod standardize;
mod store;

pub use claims::{AssembleClaimAdapter, SubmitClaimAdapter};
pub use coding::SuggestCodesAdapter;
pub use denial::{AnalyzeDenialAdapter, ClassifyDenialAdapter, DraftAppealAdapter};
pub use eligibility::CheckEligibilityAdapter;
pub use parse::ParseInputAdapter;
pub use patient::ExtractPatientInfoAdapter;
pub use standardize::ValidateStandardizeAdapter;
pub use store::StoreResultAdapter;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::{ReasoningError, ToolError};

/// First JSON object embedded in a completion, if any
static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Extract the first JSON object from completion text.
///
/// Models wrap JSON in prose or fences often enough that parsing the raw
/// completion directly is a losing game.
pub(crate) fn extract_json(text: &str) -> Option<Value> {
    let candidate = JSON_OBJECT.find(text)?.as_str();
    serde_json::from_str(candidate).ok()
}

/// Map a reasoning failure onto the tool error taxonomy. All reasoning
/// failures are transient collaborator failures from the sequencer's view.
pub(crate) fn reasoning_unavailable(error: ReasoningError) -> ToolError {
    ToolError::unavailable(error.to_string())
}

/// Map an insurance provider's display name onto its payer ID
pub(crate) fn map_insurance_provider(provider_name: &str) -> Option<&'static str> {
    const MAPPING: &[(&str, &str)] = &[
        ("daman", "DAMAN"),
        ("adnic", "ADNIC"),
        ("thiqa", "THIQA"),
        ("bupa", "BUPA"),
        ("abu dhabi national insurance", "ADNIC"),
    ];

    let lower = provider_name.to_lowercase();
    MAPPING
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, id)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_from_prose() {
        let text = "Here are the codes:\n```json\n{\"codes\": [1, 2]}\n```\nLet me know.";
        assert_eq!(extract_json(text), Some(json!({"codes": [1, 2]})));
    }

    #[test]
    fn test_extract_json_absent() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("{broken"), None);
    }

    #[test]
    fn test_map_insurance_provider() {
        assert_eq!(map_insurance_provider("Daman National Health"), Some("DAMAN"));
        assert_eq!(
            map_insurance_provider("Abu Dhabi National Insurance Co"),
            Some("ADNIC")
        );
        assert_eq!(map_insurance_provider("Bupa Arabia"), Some("BUPA"));
        assert_eq!(map_insurance_provider("Unknown Mutual"), None);
    }
}
