//! Denial handling adapters
//!
//! Classification is a deterministic lookup over the standard adjustment
//! reason codes the regional payers actually emit; root-cause analysis and
//! appeal drafting go through the reasoning collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::{
    Capability, CompletionRequest, ConfidenceSignals, ReasoningProvider, StepInput, StepName,
    ToolAdapter, ToolError, ToolResponse, ValidationIssue,
};

use super::records::{AppealDraft, DenialAnalysis};
use super::{extract_json, prompts, reasoning_unavailable};

/// Claim adjustment reason code -> denial category
const DENIAL_CATEGORIES: &[(&str, &str)] = &[
    ("26", "eligibility"),
    ("27", "eligibility"),
    ("4", "coding"),
    ("16", "coding"),
    ("11", "coding"),
    ("197", "authorization"),
    ("62", "authorization"),
    ("29", "timely-filing"),
];

#[derive(Debug, Default)]
pub struct ClassifyDenialAdapter;

impl ClassifyDenialAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolAdapter for ClassifyDenialAdapter {
    fn name(&self) -> &'static str {
        "classify-denial"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::RulesOnly]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let Some(denial_code) = input.input_field("denial_code").and_then(Value::as_str) else {
            return Ok(ToolResponse::new(Value::Null, ConfidenceSignals::default())
                .with_issue(ValidationIssue::blocking(
                    "denial_code",
                    "denial input has no denial_code",
                )));
        };

        let category = DENIAL_CATEGORIES
            .iter()
            .find(|(code, _)| *code == denial_code)
            .map(|(_, category)| *category);

        let (category, rule_match, issues) = match category {
            Some(category) => (category, 1.0, Vec::new()),
            None => (
                "other",
                0.7,
                vec![ValidationIssue::advisory(
                    "denial_code",
                    format!("unmapped adjustment reason code '{denial_code}'"),
                )],
            ),
        };

        let payload = json!({
            "denial_code": denial_code,
            "category": category,
            "denial_reason": input.input_field("denial_reason"),
            "claim_number": input.input_field("claim_number"),
        });

        Ok(
            ToolResponse::new(payload, ConfidenceSignals::rules(rule_match).with_consistency(1.0))
                .with_issues(issues),
        )
    }
}

/// Root-cause analysis over the classified denial
#[derive(Debug)]
pub struct AnalyzeDenialAdapter {
    reasoning: Arc<dyn ReasoningProvider>,
}

impl AnalyzeDenialAdapter {
    pub fn new(reasoning: Arc<dyn ReasoningProvider>) -> Self {
        Self { reasoning }
    }
}

#[async_trait]
impl ToolAdapter for AnalyzeDenialAdapter {
    fn name(&self) -> &'static str {
        "analyze-denial"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Reasoning]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let classification = input
            .prior_output(StepName::ClassifyDenial)
            .cloned()
            .unwrap_or(Value::Null);

        let user = json!({
            "classification": classification,
            "claim_context": input.input,
        });

        let completion = self
            .reasoning
            .complete(CompletionRequest::new(
                prompts::analyze_denial(input.attempt),
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

        let Ok(analysis) = serde_json::from_value::<DenialAnalysis>(payload.clone()) else {
            return Ok(ToolResponse::new(payload, ConfidenceSignals::default())
                .with_issue(ValidationIssue::blocking(
                    "analysis",
                    "completion did not match the expected analysis shape",
                )));
        };

        let rule_match =
            if !analysis.root_cause.trim().is_empty() && !analysis.recommended_action.trim().is_empty() {
                1.0
            } else {
                0.0
            };

        let mut signals = ConfidenceSignals::rules(rule_match)
            .with_consistency(analysis.appeal_viability.clamp(0.0, 1.0));
        if let Some(model) = analysis.confidence {
            signals = signals.with_model(model);
        }

        Ok(ToolResponse::new(payload, signals))
    }
}

/// Appeal letter drafting
#[derive(Debug)]
pub struct DraftAppealAdapter {
    reasoning: Arc<dyn ReasoningProvider>,
}

impl DraftAppealAdapter {
    pub fn new(reasoning: Arc<dyn ReasoningProvider>) -> Self {
        Self { reasoning }
    }
}

#[async_trait]
impl ToolAdapter for DraftAppealAdapter {
    fn name(&self) -> &'static str {
        "draft-appeal"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Reasoning]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let analysis = input
            .prior_output(StepName::AnalyzeDenial)
            .cloned()
            .unwrap_or(Value::Null);
        let classification = input
            .prior_output(StepName::ClassifyDenial)
            .cloned()
            .unwrap_or(Value::Null);

        let user = json!({
            "classification": classification,
            "analysis": analysis,
        });

        let completion = self
            .reasoning
            .complete(CompletionRequest::new(
                prompts::draft_appeal(input.attempt),
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

        let Ok(draft) = serde_json::from_value::<AppealDraft>(payload.clone()) else {
            return Ok(ToolResponse::new(payload, ConfidenceSignals::default())
                .with_issue(ValidationIssue::blocking(
                    "appeal",
                    "completion did not match the expected appeal shape",
                )));
        };

        let mut issues = Vec::new();
        if draft.letter.trim().is_empty() {
            issues.push(ValidationIssue::blocking("letter", "appeal letter is empty"));
        }
        if draft.attachments.is_empty() {
            issues.push(ValidationIssue::advisory(
                "attachments",
                "no supporting documents listed",
            ));
        }

        let rule_match = match (draft.letter.trim().is_empty(), draft.attachments.is_empty()) {
            (false, false) => 1.0,
            (false, true) => 0.7,
            _ => 0.0,
        };

        let mut signals = ConfidenceSignals::rules(rule_match);
        if let Some(model) = draft.confidence {
            signals = signals.with_model(model);
        }

        Ok(ToolResponse::new(payload, signals).with_issues(issues))
    }
}
