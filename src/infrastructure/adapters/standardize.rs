//! Validation and standardization adapter
//!
//! Deterministic rules only: normalizes dates to ISO-8601, title-cases the
//! patient name, and maps the insurance provider to its payer ID. An
//! unparseable date of birth or service date is a blocking issue since every
//! downstream step depends on them.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::{
    Capability, ConfidenceSignals, StepInput, StepName, ToolAdapter, ToolError, ToolResponse,
    ValidationIssue,
};

use super::map_insurance_provider;
use super::patient::parse_loose_date;
use super::records::{EncounterRecord, PatientRecord};

#[derive(Debug, Default)]
pub struct ValidateStandardizeAdapter;

impl ValidateStandardizeAdapter {
    pub fn new() -> Self {
        Self
    }

    fn title_case(value: &str) -> String {
        value
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn normalize_date(
        value: Option<&String>,
        field: &str,
        issues: &mut Vec<ValidationIssue>,
    ) -> Option<String> {
        let raw = value?;
        match parse_loose_date(raw) {
            Some(date) => Some(date.format("%Y-%m-%d").to_string()),
            None => {
                issues.push(ValidationIssue::blocking(
                    field,
                    format!("cannot normalize date '{raw}'"),
                ));
                None
            }
        }
    }
}

#[async_trait]
impl ToolAdapter for ValidateStandardizeAdapter {
    fn name(&self) -> &'static str {
        "validate-standardize"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::RulesOnly]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let extracted = input
            .prior_output(StepName::ExtractPatientInfo)
            .cloned()
            .unwrap_or(Value::Null);

        let mut patient: PatientRecord = extracted
            .get("patient")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let mut encounter: EncounterRecord = extracted
            .get("encounter")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let mut issues = Vec::new();
        let mut normalized = 0usize;
        let mut fields = 0usize;

        if let Some(name) = patient.name.take() {
            patient.name = Some(Self::title_case(&name));
            fields += 1;
            normalized += 1;
        }

        fields += patient.date_of_birth.is_some() as usize;
        if let Some(dob) = Self::normalize_date(
            patient.date_of_birth.as_ref(),
            "patient.date_of_birth",
            &mut issues,
        ) {
            patient.date_of_birth = Some(dob);
            normalized += 1;
        }

        fields += encounter.service_date.is_some() as usize;
        if let Some(date) = Self::normalize_date(
            encounter.service_date.as_ref(),
            "encounter.service_date",
            &mut issues,
        ) {
            encounter.service_date = Some(date);
            normalized += 1;
        }

        if let Some(gender) = patient.gender.take() {
            let gender = gender.to_lowercase();
            patient.gender = Some(match gender.as_str() {
                "m" => "male".to_string(),
                "f" => "female".to_string(),
                other => other.to_string(),
            });
            fields += 1;
            normalized += 1;
        }

        let payer_id = patient
            .insurance_provider
            .as_deref()
            .and_then(map_insurance_provider);
        if let Some(ref provider) = patient.insurance_provider {
            fields += 1;
            if payer_id.is_some() {
                normalized += 1;
            } else {
                issues.push(ValidationIssue::advisory(
                    "patient.insurance_provider",
                    format!("no payer mapping for '{provider}'"),
                ));
            }
        }

        let rule_match = if fields == 0 {
            0.0
        } else {
            normalized as f64 / fields as f64
        };
        let consistency = if issues.iter().any(|i| i.blocking) {
            0.0
        } else {
            1.0
        };

        let payload = json!({
            "patient": patient,
            "encounter": encounter,
            "payer_id": payer_id,
        });

        Ok(
            ToolResponse::new(payload, ConfidenceSignals::rules(rule_match).with_consistency(consistency))
                .with_issues(issues),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CaseId, WorkflowKind};

    fn step_input(extracted: Value) -> StepInput {
        let mut prior = serde_json::Map::new();
        prior.insert("extract-patient-info".to_string(), extracted);

        StepInput {
            case: CaseId::new("case-1").unwrap(),
            kind: WorkflowKind::EncounterProcessing,
            step: StepName::ValidateStandardize,
            attempt: 1,
            input: json!({}),
            prior,
        }
    }

    #[tokio::test]
    async fn test_normalizes_clean_record() {
        let adapter = ValidateStandardizeAdapter::new();
        let response = adapter
            .execute(step_input(json!({
                "patient": {
                    "name": "john doe",
                    "date_of_birth": "01/02/1980",
                    "gender": "M",
                    "insurance_provider": "Daman National Health",
                    "policy_number": "P-1",
                    "mrn": "MRN-9"
                },
                "encounter": {"service_date": "2024-06-01", "chief_complaint": "chest pain"}
            })))
            .await
            .unwrap();

        assert!(!response.has_blocking_issues());
        assert_eq!(response.signals.rule_match, Some(1.0));
        assert_eq!(response.payload["patient"]["name"], json!("John Doe"));
        assert_eq!(
            response.payload["patient"]["date_of_birth"],
            json!("1980-02-01")
        );
        assert_eq!(response.payload["patient"]["gender"], json!("male"));
        assert_eq!(response.payload["payer_id"], json!("DAMAN"));
    }

    #[tokio::test]
    async fn test_unparseable_dob_blocks() {
        let adapter = ValidateStandardizeAdapter::new();
        let response = adapter
            .execute(step_input(json!({
                "patient": {"name": "John", "date_of_birth": "around 1980"},
                "encounter": {}
            })))
            .await
            .unwrap();

        assert!(response.has_blocking_issues());
        assert_eq!(response.signals.consistency, Some(0.0));
    }

    #[tokio::test]
    async fn test_unknown_insurer_is_advisory_only() {
        let adapter = ValidateStandardizeAdapter::new();
        let response = adapter
            .execute(step_input(json!({
                "patient": {"name": "John", "insurance_provider": "Acme Mutual"},
                "encounter": {}
            })))
            .await
            .unwrap();

        assert!(!response.has_blocking_issues());
        assert_eq!(response.payload["payer_id"], Value::Null);
        assert!(response.issues.iter().any(|i| !i.blocking));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(ValidateStandardizeAdapter::title_case("john doe"), "John Doe");
        assert_eq!(ValidateStandardizeAdapter::title_case("AL ain"), "AL Ain");
    }
}
