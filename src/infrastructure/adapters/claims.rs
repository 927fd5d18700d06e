//! Claim assembly and submission adapters
//!
//! Assembly is deterministic: amounts come from a CPT-prefix fee schedule
//! and the patient responsibility from the verified coverage terms.
//! Submission goes through the payer gateway; a payer rejection escalates to
//! a human rather than failing the case outright.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};

use crate::domain::{
    Capability, ClaimSubmission, ConfidenceSignals, PayerError, PayerGateway, StepInput, StepName,
    ToolAdapter, ToolError, ToolResponse, ValidationIssue,
};

use super::records::{ClaimRecord, CodeSet};

/// Base fees by CPT prefix (evaluation & management, cardiology, lab, other)
const FEE_SCHEDULE: &[(&str, f64)] = &[("99", 220.0), ("93", 450.0), ("80", 120.0), ("70", 380.0)];

const DEFAULT_FEE: f64 = 150.0;

fn fee_for(code: &str) -> f64 {
    FEE_SCHEDULE
        .iter()
        .find(|(prefix, _)| code.starts_with(prefix))
        .map(|(_, fee)| *fee)
        .unwrap_or(DEFAULT_FEE)
}

fn generate_claim_number() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..8).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect();
    format!("CLM{digits}")
}

/// Patient responsibility: copay + applied deductible + coinsurance on the
/// remainder, never more than the claim total.
fn patient_responsibility(total: f64, coverage: &Value) -> f64 {
    let copay = coverage
        .get("copay_amount")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let deductible_remaining = coverage
        .get("deductible_remaining")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    let coverage_percentage = coverage
        .get("coverage_percentage")
        .and_then(Value::as_f64)
        .unwrap_or(80.0)
        / 100.0;

    let deductible_applied = total.min(deductible_remaining);
    let remainder = total - deductible_applied;
    let coinsurance = remainder * (1.0 - coverage_percentage);

    ((copay + deductible_applied + coinsurance).min(total) * 100.0).round() / 100.0
}

#[derive(Debug, Default)]
pub struct AssembleClaimAdapter;

impl AssembleClaimAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolAdapter for AssembleClaimAdapter {
    fn name(&self) -> &'static str {
        "assemble-claim"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::RulesOnly]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let eligibility = input
            .prior_output(StepName::CheckEligibility)
            .cloned()
            .unwrap_or(Value::Null);

        let mut issues = Vec::new();

        if eligibility.get("eligible").and_then(Value::as_bool) != Some(true) {
            issues.push(ValidationIssue::blocking(
                "eligibility",
                "cannot assemble a claim without a verified eligible coverage",
            ));
        }

        let codes: CodeSet = input
            .input_field("codes")
            .or_else(|| input.prior_output(StepName::SuggestCodes))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default();

        if codes.cpt_codes.is_empty() {
            issues.push(ValidationIssue::blocking(
                "cpt_codes",
                "no procedure codes to bill",
            ));
        }

        if issues.iter().any(|i| i.blocking) {
            return Ok(
                ToolResponse::new(Value::Null, ConfidenceSignals::default()).with_issues(issues)
            );
        }

        let total: f64 = codes.cpt_codes.iter().map(|code| fee_for(&code.code)).sum();
        let coverage = eligibility.get("coverage").cloned().unwrap_or(Value::Null);
        let responsibility = patient_responsibility(total, &coverage);

        let payer_id = eligibility
            .get("payer_id")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();

        let claim = ClaimRecord {
            claim_number: generate_claim_number(),
            payer_id,
            total_amount: total,
            patient_responsibility: responsibility,
            diagnosis_codes: codes
                .icd10_codes
                .iter()
                .map(|c| json!({"code": c.code, "description": c.description, "confidence": c.confidence}))
                .collect(),
            procedure_codes: codes
                .cpt_codes
                .iter()
                .map(|c| json!({"code": c.code, "description": c.description, "confidence": c.confidence, "modifier": c.modifier}))
                .collect(),
            status: "ready_for_submission".to_string(),
        };

        let payload = serde_json::to_value(&claim)
            .map_err(|e| ToolError::unavailable(format!("claim serialization: {e}")))?;

        Ok(ToolResponse::new(
            payload,
            ConfidenceSignals::rules(1.0).with_consistency(1.0),
        ))
    }
}

#[derive(Debug)]
pub struct SubmitClaimAdapter {
    gateway: Arc<dyn PayerGateway>,
}

impl SubmitClaimAdapter {
    pub fn new(gateway: Arc<dyn PayerGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ToolAdapter for SubmitClaimAdapter {
    fn name(&self) -> &'static str {
        "submit-claim"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::ClaimSubmission]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let Some(claim) = input
            .prior_output(StepName::AssembleClaim)
            .and_then(|value| serde_json::from_value::<ClaimRecord>(value.clone()).ok())
        else {
            return Ok(ToolResponse::new(Value::Null, ConfidenceSignals::default())
                .with_issue(ValidationIssue::blocking(
                    "claim",
                    "no assembled claim to submit",
                )));
        };

        let submission = ClaimSubmission {
            claim_number: claim.claim_number.clone(),
            payer_id: claim.payer_id.clone(),
            total_amount: claim.total_amount,
            patient_responsibility: claim.patient_responsibility,
            diagnosis_codes: claim.diagnosis_codes.clone(),
            procedure_codes: claim.procedure_codes.clone(),
        };

        let outcome = match self.gateway.submit_claim(submission).await {
            Ok(outcome) => outcome,
            Err(PayerError::Unavailable(detail)) => return Err(ToolError::unavailable(detail)),
        };

        let mut issues = Vec::new();
        let consistency = if outcome.accepted {
            0.95
        } else {
            issues.push(ValidationIssue::advisory(
                "submission",
                format!(
                    "payer rejected the claim: {}",
                    outcome
                        .rejection_reason
                        .as_deref()
                        .unwrap_or("no reason given")
                ),
            ));
            0.5
        };

        let payload = json!({
            "claim_number": claim.claim_number,
            "accepted": outcome.accepted,
            "reference_number": outcome.reference_number,
            "tracking_number": outcome.tracking_number,
            "rejection_reason": outcome.rejection_reason,
            "estimated_processing_days": outcome.estimated_processing_days,
        });

        Ok(ToolResponse::new(
            payload,
            ConfidenceSignals::rules(1.0).with_consistency(consistency),
        )
        .with_issues(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payer::mock::MockPayerGateway;
    use crate::domain::{CaseId, SubmissionOutcome, WorkflowKind};

    fn codes() -> Value {
        json!({
            "icd10_codes": [{"code": "R07.4", "description": "Chest pain",
                "confidence": 0.9, "rationale": "complaint"}],
            "cpt_codes": [
                {"code": "99213", "description": "Office visit", "confidence": 0.9, "rationale": "visit"},
                {"code": "93000", "description": "ECG", "confidence": 0.85, "rationale": "cardiac workup"}
            ]
        })
    }

    fn assemble_input() -> StepInput {
        let mut prior = serde_json::Map::new();
        prior.insert(
            "check-eligibility".to_string(),
            json!({
                "eligible": true,
                "payer_id": "DAMAN",
                "coverage": {"copay_amount": 20.0, "deductible_remaining": 100.0, "coverage_percentage": 80},
            }),
        );

        StepInput {
            case: CaseId::new("case-1").unwrap(),
            kind: WorkflowKind::ClaimsProcessing,
            step: StepName::AssembleClaim,
            attempt: 1,
            input: json!({"codes": codes()}),
            prior,
        }
    }

    #[tokio::test]
    async fn test_assembles_claim_with_fee_schedule() {
        let adapter = AssembleClaimAdapter::new();
        let response = adapter.execute(assemble_input()).await.unwrap();

        assert!(!response.has_blocking_issues());
        // 99213 -> 220, 93000 -> 450
        assert_eq!(response.payload["total_amount"], json!(670.0));
        assert!(response.payload["claim_number"]
            .as_str()
            .unwrap()
            .starts_with("CLM"));

        // copay 20 + deductible 100 + 20% of remaining 570 = 234
        assert_eq!(response.payload["patient_responsibility"], json!(234.0));
    }

    #[tokio::test]
    async fn test_assembly_requires_eligibility() {
        let adapter = AssembleClaimAdapter::new();
        let mut input = assemble_input();
        input.prior.remove("check-eligibility");

        let response = adapter.execute(input).await.unwrap();
        assert!(response.has_blocking_issues());
    }

    #[tokio::test]
    async fn test_assembly_requires_procedure_codes() {
        let adapter = AssembleClaimAdapter::new();
        let mut input = assemble_input();
        input.input = json!({"codes": {"icd10_codes": [], "cpt_codes": []}});

        let response = adapter.execute(input).await.unwrap();
        assert!(response.has_blocking_issues());
    }

    fn submit_input() -> StepInput {
        let mut prior = serde_json::Map::new();
        prior.insert(
            "assemble-claim".to_string(),
            json!({
                "claim_number": "CLM12345678",
                "payer_id": "DAMAN",
                "total_amount": 670.0,
                "patient_responsibility": 234.0,
                "diagnosis_codes": [{"code": "R07.4"}],
                "procedure_codes": [{"code": "99213"}],
                "status": "ready_for_submission",
            }),
        );

        StepInput {
            case: CaseId::new("case-1").unwrap(),
            kind: WorkflowKind::ClaimsProcessing,
            step: StepName::SubmitClaim,
            attempt: 1,
            input: json!({}),
            prior,
        }
    }

    #[tokio::test]
    async fn test_accepted_submission_scores_high() {
        let gateway = Arc::new(MockPayerGateway::new().with_submission(SubmissionOutcome {
            accepted: true,
            reference_number: Some("REF0000000001".to_string()),
            tracking_number: Some("TRK00000001".to_string()),
            rejection_reason: None,
            estimated_processing_days: Some(5),
        }));
        let adapter = SubmitClaimAdapter::new(gateway);

        let response = adapter.execute(submit_input()).await.unwrap();
        assert_eq!(response.payload["accepted"], json!(true));
        assert_eq!(response.signals.consistency, Some(0.95));
    }

    #[tokio::test]
    async fn test_rejected_submission_escalates() {
        let gateway = Arc::new(MockPayerGateway::new().with_submission(SubmissionOutcome {
            accepted: false,
            reference_number: None,
            tracking_number: None,
            rejection_reason: Some("Missing documentation".to_string()),
            estimated_processing_days: None,
        }));
        let adapter = SubmitClaimAdapter::new(gateway);

        let response = adapter.execute(submit_input()).await.unwrap();
        assert_eq!(response.signals.consistency, Some(0.5));
        assert!(!response.has_blocking_issues());
        assert!(response.issues[0].message.contains("Missing documentation"));
    }

    #[tokio::test]
    async fn test_missing_claim_blocks() {
        let gateway = Arc::new(MockPayerGateway::new());
        let adapter = SubmitClaimAdapter::new(gateway);

        let mut input = submit_input();
        input.prior.clear();

        let response = adapter.execute(input).await.unwrap();
        assert!(response.has_blocking_issues());
    }

    #[test]
    fn test_patient_responsibility_bounded_by_total() {
        let coverage = json!({"copay_amount": 500.0, "deductible_remaining": 500.0, "coverage_percentage": 0});
        assert_eq!(patient_responsibility(100.0, &coverage), 100.0);
    }

    #[test]
    fn test_fee_schedule_prefixes() {
        assert_eq!(fee_for("99213"), 220.0);
        assert_eq!(fee_for("93000"), 450.0);
        assert_eq!(fee_for("80050"), 120.0);
        assert_eq!(fee_for("12345"), DEFAULT_FEE);
    }
}
