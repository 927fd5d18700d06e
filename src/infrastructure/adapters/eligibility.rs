//! Eligibility checking adapter
//!
//! Verifies coverage against the payer gateway. An ineligible patient or a
//! prior-authorization requirement is not an error: the adapter caps its
//! consistency signal so the gate lands in the human-review band and a staff
//! member decides how to proceed (self-pay, alternate coverage, prior auth).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::domain::{
    Capability, ConfidenceSignals, EligibilityRequest, PayerError, PayerGateway, StepInput,
    StepName, ToolAdapter, ToolError, ToolResponse, ValidationIssue,
};

use super::patient::parse_loose_date;
use super::records::CodeSet;

/// Consistency reported when the result needs a human decision; keeps the
/// blended score inside the review band under the default policy.
const ESCALATION_CONSISTENCY: f64 = 0.5;

#[derive(Debug)]
pub struct CheckEligibilityAdapter {
    gateway: Arc<dyn PayerGateway>,
}

impl CheckEligibilityAdapter {
    pub fn new(gateway: Arc<dyn PayerGateway>) -> Self {
        Self { gateway }
    }

    fn build_request(input: &StepInput) -> Result<EligibilityRequest, ValidationIssue> {
        // Standardized output when running inside encounter processing,
        // otherwise the fields arrive directly on the claims-processing input.
        let standardized = input
            .prior_output(StepName::ValidateStandardize)
            .cloned()
            .unwrap_or_else(|| input.input.clone());

        let payer_id = standardized
            .get("payer_id")
            .and_then(Value::as_str)
            .or_else(|| input.input_field("payer_id").and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| {
                ValidationIssue::blocking("payer_id", "no payer id available for eligibility")
            })?;

        let member_id = standardized
            .pointer("/patient/policy_number")
            .or_else(|| input.input_field("policy_number"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ValidationIssue::blocking("policy_number", "no policy number available")
            })?;

        let service_date = standardized
            .pointer("/encounter/service_date")
            .or_else(|| input.input_field("service_date"))
            .and_then(Value::as_str)
            .and_then(parse_loose_date)
            .unwrap_or_else(|| Utc::now().date_naive());

        let proposed_services = input
            .prior_output(StepName::SuggestCodes)
            .or_else(|| input.input_field("codes"))
            .and_then(|codes| serde_json::from_value::<CodeSet>(codes.clone()).ok())
            .map(|set| set.all_codes().map(|c| c.code.clone()).collect())
            .unwrap_or_default();

        Ok(EligibilityRequest {
            payer_id,
            member_id,
            service_date,
            proposed_services,
        })
    }
}

#[async_trait]
impl ToolAdapter for CheckEligibilityAdapter {
    fn name(&self) -> &'static str {
        "check-eligibility"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::EligibilityLookup]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let request = match Self::build_request(&input) {
            Ok(request) => request,
            Err(issue) => {
                return Ok(
                    ToolResponse::new(Value::Null, ConfidenceSignals::default()).with_issue(issue),
                )
            }
        };

        let response = match self.gateway.check_eligibility(request).await {
            Ok(response) => response,
            Err(PayerError::Unavailable(detail)) => return Err(ToolError::unavailable(detail)),
        };

        let mut issues = Vec::new();
        let consistency = if !response.eligible {
            issues.push(ValidationIssue::advisory(
                "eligible",
                format!(
                    "patient is not eligible: {}",
                    response.reason.as_deref().unwrap_or("no reason given")
                ),
            ));
            ESCALATION_CONSISTENCY
        } else if response.requires_prior_auth {
            issues.push(ValidationIssue::advisory(
                "requires_prior_auth",
                "prior authorization is required for a proposed service",
            ));
            ESCALATION_CONSISTENCY
        } else {
            0.95
        };

        let signals = ConfidenceSignals::model(response.confidence).with_consistency(consistency);
        let payload = json!({
            "eligible": response.eligible,
            "payer_id": response.payer_id,
            "reason": response.reason,
            "coverage": response.coverage,
            "requires_prior_auth": response.requires_prior_auth,
            "verified_at": Utc::now().to_rfc3339(),
        });

        Ok(ToolResponse::new(payload, signals).with_issues(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payer::mock::MockPayerGateway;
    use crate::domain::{CaseId, EligibilityResponse, WorkflowKind};

    fn claims_input() -> StepInput {
        StepInput {
            case: CaseId::new("case-1").unwrap(),
            kind: WorkflowKind::ClaimsProcessing,
            step: StepName::CheckEligibility,
            attempt: 1,
            input: json!({
                "payer_id": "DAMAN",
                "policy_number": "P-1",
                "service_date": "2024-06-01",
            }),
            prior: serde_json::Map::new(),
        }
    }

    fn eligible_response() -> EligibilityResponse {
        EligibilityResponse {
            eligible: true,
            payer_id: "DAMAN".to_string(),
            reason: None,
            coverage: json!({"copay_amount": 20.0, "coverage_percentage": 80}),
            requires_prior_auth: false,
            confidence: 0.95,
        }
    }

    #[tokio::test]
    async fn test_eligible_scores_high() {
        let gateway = Arc::new(MockPayerGateway::new().with_eligibility(eligible_response()));
        let adapter = CheckEligibilityAdapter::new(gateway);

        let response = adapter.execute(claims_input()).await.unwrap();
        assert_eq!(response.signals.consistency, Some(0.95));
        assert_eq!(response.payload["eligible"], json!(true));
        assert!(response.issues.is_empty());
    }

    #[tokio::test]
    async fn test_ineligible_caps_consistency() {
        let mut ineligible = eligible_response();
        ineligible.eligible = false;
        ineligible.reason = Some("Policy expired".to_string());

        let gateway = Arc::new(MockPayerGateway::new().with_eligibility(ineligible));
        let adapter = CheckEligibilityAdapter::new(gateway);

        let response = adapter.execute(claims_input()).await.unwrap();
        assert_eq!(response.signals.consistency, Some(ESCALATION_CONSISTENCY));
        assert!(!response.has_blocking_issues());
        assert!(response.issues[0].message.contains("Policy expired"));
    }

    #[tokio::test]
    async fn test_prior_auth_caps_consistency() {
        let mut with_auth = eligible_response();
        with_auth.requires_prior_auth = true;

        let gateway = Arc::new(MockPayerGateway::new().with_eligibility(with_auth));
        let adapter = CheckEligibilityAdapter::new(gateway);

        let response = adapter.execute(claims_input()).await.unwrap();
        assert_eq!(response.signals.consistency, Some(ESCALATION_CONSISTENCY));
    }

    #[tokio::test]
    async fn test_gateway_outage_is_unavailable() {
        let gateway =
            Arc::new(MockPayerGateway::new().with_eligibility_error(PayerError::unavailable(
                "eligibility endpoint timed out",
            )));
        let adapter = CheckEligibilityAdapter::new(gateway);

        let result = adapter.execute(claims_input()).await;
        assert!(matches!(result, Err(ToolError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_payer_blocks_without_gateway_call() {
        let gateway = Arc::new(MockPayerGateway::new());
        let adapter = CheckEligibilityAdapter::new(gateway.clone());

        let mut input = claims_input();
        input.input = json!({});

        let response = adapter.execute(input).await.unwrap();
        assert!(response.has_blocking_issues());
        assert_eq!(gateway.eligibility_calls(), 0);
    }

    #[tokio::test]
    async fn test_uses_standardized_output_when_present() {
        let gateway = Arc::new(MockPayerGateway::new().with_eligibility(eligible_response()));
        let adapter = CheckEligibilityAdapter::new(gateway);

        let mut input = claims_input();
        input.input = json!({});
        input.prior.insert(
            "validate-standardize".to_string(),
            json!({
                "patient": {"policy_number": "P-77"},
                "encounter": {"service_date": "2024-05-05"},
                "payer_id": "THIQA",
            }),
        );

        let response = adapter.execute(input).await.unwrap();
        assert_eq!(response.payload["eligible"], json!(true));
    }
}
