//! Medical coding adapter
//!
//! Suggests ICD-10 and CPT codes for the standardized encounter. The model's
//! overall estimate feeds the model signal; the fraction of codes matching
//! the code-format grammars feeds rule-match, and malformed codes are
//! blocking so they never reach a claim.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::domain::{
    Capability, CompletionRequest, ConfidenceSignals, ReasoningProvider, StepInput, StepName,
    ToolAdapter, ToolError, ToolResponse, ValidationIssue,
};

use super::records::CodeSet;
use super::{extract_json, prompts, reasoning_unavailable};

static ICD10_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-TV-Z][0-9][0-9A-Z](\.[0-9A-Z]{1,4})?$").unwrap());

static CPT_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{5}$").unwrap());

#[derive(Debug)]
pub struct SuggestCodesAdapter {
    reasoning: Arc<dyn ReasoningProvider>,
}

impl SuggestCodesAdapter {
    pub fn new(reasoning: Arc<dyn ReasoningProvider>) -> Self {
        Self { reasoning }
    }
}

#[async_trait]
impl ToolAdapter for SuggestCodesAdapter {
    fn name(&self) -> &'static str {
        "suggest-codes"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Reasoning]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let standardized = input
            .prior_output(StepName::ValidateStandardize)
            .cloned()
            .unwrap_or(Value::Null);

        let user = json!({
            "clinical_data": standardized,
            "payer_id": standardized.get("payer_id"),
        });

        let completion = self
            .reasoning
            .complete(CompletionRequest::new(
                prompts::suggest_codes(input.attempt),
                user.to_string(),
            ))
            .await
            .map_err(reasoning_unavailable)?;

        let Some(payload) = extract_json(&completion.as_text()) else {
            return Ok(ToolResponse::new(Value::Null, ConfidenceSignals::default())
                .with_issue(ValidationIssue::blocking(
                    "completion",
                    "completion contained no JSON object",
                )));
        };

        let Ok(codes) = serde_json::from_value::<CodeSet>(payload.clone()) else {
            return Ok(ToolResponse::new(payload, ConfidenceSignals::default())
                .with_issue(ValidationIssue::blocking(
                    "codes",
                    "completion did not match the expected code set shape",
                )));
        };

        if codes.is_empty() {
            return Ok(ToolResponse::new(payload, ConfidenceSignals::default())
                .with_issue(ValidationIssue::blocking(
                    "codes",
                    "no codes were suggested for the encounter",
                )));
        }

        let mut issues = Vec::new();
        let mut well_formed = 0usize;
        let total = codes.icd10_codes.len() + codes.cpt_codes.len();

        for code in &codes.icd10_codes {
            if ICD10_FORMAT.is_match(&code.code) {
                well_formed += 1;
            } else {
                issues.push(ValidationIssue::blocking(
                    "icd10_codes",
                    format!("'{}' is not a valid ICD-10 code", code.code),
                ));
            }
        }
        for code in &codes.cpt_codes {
            if CPT_FORMAT.is_match(&code.code) {
                well_formed += 1;
            } else {
                issues.push(ValidationIssue::blocking(
                    "cpt_codes",
                    format!("'{}' is not a valid CPT code", code.code),
                ));
            }
        }

        let model = codes
            .overall_confidence
            .or_else(|| codes.mean_confidence())
            .unwrap_or(0.0);
        let signals = ConfidenceSignals::model(model)
            .with_rule_match(well_formed as f64 / total as f64);

        Ok(ToolResponse::new(payload, signals).with_issues(issues))
    }
}
