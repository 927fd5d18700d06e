//! Patient info extraction adapter
//!
//! Turns segmented intake text into patient and encounter records. Coverage
//! of the required fields feeds the rule-match signal; date and vocabulary
//! checks feed consistency, so hallucinated or incomplete extractions score
//! low and get retried or escalated instead of flowing downstream.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::domain::{
    Capability, CompletionRequest, ConfidenceSignals, ReasoningProvider, StepInput, StepName,
    ToolAdapter, ToolError, ToolResponse, ValidationIssue,
};

use super::records::{EncounterRecord, PatientRecord};
use super::{extract_json, prompts, reasoning_unavailable};

const GENDER_VOCABULARY: [&str; 4] = ["male", "female", "m", "f"];

/// Date shapes the extraction is allowed to produce
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];

pub(crate) fn parse_loose_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

#[derive(Debug)]
pub struct ExtractPatientInfoAdapter {
    reasoning: Arc<dyn ReasoningProvider>,
}

impl ExtractPatientInfoAdapter {
    pub fn new(reasoning: Arc<dyn ReasoningProvider>) -> Self {
        Self { reasoning }
    }

    /// Fraction of consistency checks that pass: parseable DOB and service
    /// date, recognized gender.
    fn consistency(patient: &PatientRecord, encounter: &EncounterRecord) -> f64 {
        let mut checks = 0usize;
        let mut passed = 0usize;

        if let Some(ref dob) = patient.date_of_birth {
            checks += 1;
            if parse_loose_date(dob).is_some() {
                passed += 1;
            }
        }
        if let Some(ref gender) = patient.gender {
            checks += 1;
            if GENDER_VOCABULARY.contains(&gender.to_lowercase().as_str()) {
                passed += 1;
            }
        }
        if let Some(ref service_date) = encounter.service_date {
            checks += 1;
            if parse_loose_date(service_date).is_some() {
                passed += 1;
            }
        }

        if checks == 0 {
            return 0.0;
        }
        passed as f64 / checks as f64
    }
}

#[async_trait]
impl ToolAdapter for ExtractPatientInfoAdapter {
    fn name(&self) -> &'static str {
        "extract-patient-info"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Reasoning]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let segments = input
            .prior_output(StepName::ParseInput)
            .cloned()
            .unwrap_or(Value::Null);
        let raw = input
            .input_field("raw_input")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let user = json!({
            "raw_input": raw,
            "segments": segments.get("segments").cloned().unwrap_or(segments),
        });

        let completion = self
            .reasoning
            .complete(CompletionRequest::new(
                prompts::extract_patient_info(input.attempt),
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

        let patient: PatientRecord = payload
            .get("patient")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .ok()
            .flatten()
            .unwrap_or_default();
        let encounter: EncounterRecord = payload
            .get("encounter")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .ok()
            .flatten()
            .unwrap_or_default();

        let mut issues = Vec::new();
        if let Some(ref dob) = patient.date_of_birth {
            if parse_loose_date(dob).is_none() {
                issues.push(ValidationIssue::advisory(
                    "patient.date_of_birth",
                    format!("unrecognized date shape '{dob}'"),
                ));
            }
        }
        if patient.insurance_provider.is_none() {
            issues.push(ValidationIssue::advisory(
                "patient.insurance_provider",
                "no insurance provider found; eligibility checks will need it",
            ));
        }

        let mut signals = ConfidenceSignals::rules(patient.field_coverage())
            .with_consistency(Self::consistency(&patient, &encounter));
        if let Some(model) = payload.get("confidence").and_then(Value::as_f64) {
            signals = signals.with_model(model);
        }

        Ok(ToolResponse::new(payload, signals).with_issues(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reasoning::mock::MockReasoningProvider;
    use crate::domain::{CaseId, WorkflowKind};

    fn step_input() -> StepInput {
        let mut prior = serde_json::Map::new();
        prior.insert(
            "parse-input".to_string(),
            json!({"segments": {"demographics": "John Doe, DOB 1980-01-01, DAMAN policy P-1"}}),
        );

        StepInput {
            case: CaseId::new("case-1").unwrap(),
            kind: WorkflowKind::EncounterProcessing,
            step: StepName::ExtractPatientInfo,
            attempt: 1,
            input: json!({"raw_input": "patient John Doe ..."}),
            prior,
        }
    }

    #[tokio::test]
    async fn test_complete_extraction_scores_high() {
        let reasoning = Arc::new(MockReasoningProvider::new().with_text(
            r#"{"patient": {"name": "John Doe", "date_of_birth": "1980-01-01",
                 "gender": "male", "insurance_provider": "DAMAN",
                 "policy_number": "P-1", "mrn": "MRN-9"},
                "encounter": {"encounter_type": "outpatient", "service_date": "2024-06-01",
                 "chief_complaint": "chest pain"},
                "confidence": 0.9}"#,
        ));
        let adapter = ExtractPatientInfoAdapter::new(reasoning);

        let response = adapter.execute(step_input()).await.unwrap();
        assert_eq!(response.signals.rule_match, Some(1.0));
        assert_eq!(response.signals.consistency, Some(1.0));
        assert_eq!(response.signals.model, Some(0.9));
        assert!(!response.has_blocking_issues());
    }

    #[tokio::test]
    async fn test_partial_extraction_scores_lower() {
        let reasoning = Arc::new(MockReasoningProvider::new().with_text(
            r#"{"patient": {"name": "John Doe", "date_of_birth": "unknown"},
                "encounter": {}, "confidence": 0.5}"#,
        ));
        let adapter = ExtractPatientInfoAdapter::new(reasoning);

        let response = adapter.execute(step_input()).await.unwrap();
        let coverage = response.signals.rule_match.unwrap();
        assert!(coverage < 0.5);
        // unparseable DOB fails the consistency check and leaves a note
        assert_eq!(response.signals.consistency, Some(0.0));
        assert!(response
            .issues
            .iter()
            .any(|i| i.field == "patient.date_of_birth"));
    }

    #[test]
    fn test_parse_loose_date_formats() {
        assert!(parse_loose_date("1980-01-01").is_some());
        assert!(parse_loose_date("01/02/1980").is_some());
        assert!(parse_loose_date("first of May").is_none());
    }
}
