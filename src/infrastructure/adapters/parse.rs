//! Input parsing adapter
//!
//! First step of encounter processing: segments the raw clinical text so the
//! extraction step works on labeled fragments instead of one blob.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{
    Capability, CompletionRequest, ConfidenceSignals, ReasoningProvider, StepInput, ToolAdapter,
    ToolError, ToolResponse, ValidationIssue,
};

use super::{extract_json, prompts, reasoning_unavailable};

const SEGMENT_KEYS: [&str; 3] = ["demographics", "complaint", "clinical_notes"];

#[derive(Debug)]
pub struct ParseInputAdapter {
    reasoning: Arc<dyn ReasoningProvider>,
}

impl ParseInputAdapter {
    pub fn new(reasoning: Arc<dyn ReasoningProvider>) -> Self {
        Self { reasoning }
    }
}

#[async_trait]
impl ToolAdapter for ParseInputAdapter {
    fn name(&self) -> &'static str {
        "parse-input"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Reasoning]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let Some(raw) = input.input_field("raw_input").and_then(Value::as_str) else {
            return Ok(ToolResponse::new(Value::Null, ConfidenceSignals::default())
                .with_issue(ValidationIssue::blocking(
                    "raw_input",
                    "case input has no raw_input text to parse",
                )));
        };

        let completion = self
            .reasoning
            .complete(CompletionRequest::new(
                prompts::parse_input(input.attempt),
                raw,
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

        let model = payload.get("confidence").and_then(Value::as_f64);
        let segments_present = SEGMENT_KEYS
            .iter()
            .filter(|key| {
                payload
                    .pointer(&format!("/segments/{key}"))
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.trim().is_empty())
            })
            .count();
        let rule_match = segments_present as f64 / SEGMENT_KEYS.len() as f64;

        let mut signals = ConfidenceSignals::rules(rule_match);
        if let Some(model) = model {
            signals = signals.with_model(model);
        }

        Ok(ToolResponse::new(payload, signals))
    }
}
