//! Mock payer gateway
//!
//! Simulates the regional payers the platform integrates with. Coverage
//! terms come from a fixed payer table; reference and tracking numbers are
//! generated per submission.

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;

use crate::domain::{
    ClaimSubmission, EligibilityRequest, EligibilityResponse, PayerError, PayerGateway,
    SubmissionOutcome,
};

/// Coverage terms for one payer
#[derive(Debug, Clone)]
struct PayerProfile {
    name: &'static str,
    copay_amount: f64,
    coverage_percentage: u32,
    /// CPT/service prefixes that require prior authorization
    prior_auth_prefixes: &'static [&'static str],
}

const PAYERS: &[(&str, PayerProfile)] = &[
    (
        "ADNIC",
        PayerProfile {
            name: "Abu Dhabi National Insurance Company",
            copay_amount: 25.0,
            coverage_percentage: 80,
            prior_auth_prefixes: &["70", "71"],
        },
    ),
    (
        "DAMAN",
        PayerProfile {
            name: "Daman National Health Insurance",
            copay_amount: 20.0,
            coverage_percentage: 80,
            prior_auth_prefixes: &["33"],
        },
    ),
    (
        "THIQA",
        PayerProfile {
            name: "Thiqa Insurance",
            copay_amount: 30.0,
            coverage_percentage: 90,
            prior_auth_prefixes: &["33", "70"],
        },
    ),
    (
        "BUPA",
        PayerProfile {
            name: "Bupa Arabia",
            copay_amount: 35.0,
            coverage_percentage: 70,
            prior_auth_prefixes: &[],
        },
    ),
];

/// Mock implementation of the payer gateway
#[derive(Debug, Default)]
pub struct MockPayerGateway {
    /// Member ids treated as ineligible (simulates expired policies)
    ineligible_members: Vec<String>,

    /// When set, every call fails as unavailable (simulates an outage)
    outage: Option<String>,
}

impl MockPayerGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat a member id as ineligible
    pub fn with_ineligible_member(mut self, member_id: impl Into<String>) -> Self {
        self.ineligible_members.push(member_id.into());
        self
    }

    /// Simulate a full outage
    pub fn with_outage(mut self, detail: impl Into<String>) -> Self {
        self.outage = Some(detail.into());
        self
    }

    fn profile(payer_id: &str) -> Option<&'static PayerProfile> {
        PAYERS
            .iter()
            .find(|(id, _)| *id == payer_id)
            .map(|(_, profile)| profile)
    }

    fn check_outage(&self) -> Result<(), PayerError> {
        if let Some(ref detail) = self.outage {
            return Err(PayerError::unavailable(detail.clone()));
        }
        Ok(())
    }
}

fn generate_reference(prefix: &str, digits: usize) -> String {
    let mut rng = rand::thread_rng();
    let number: String = (0..digits)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect();
    format!("{prefix}{number}")
}

#[async_trait]
impl PayerGateway for MockPayerGateway {
    async fn check_eligibility(
        &self,
        request: EligibilityRequest,
    ) -> Result<EligibilityResponse, PayerError> {
        self.check_outage()?;

        let Some(profile) = Self::profile(&request.payer_id) else {
            return Ok(EligibilityResponse {
                eligible: false,
                payer_id: request.payer_id,
                reason: Some("Unknown payer".to_string()),
                coverage: serde_json::Value::Null,
                requires_prior_auth: false,
                confidence: 0.95,
            });
        };

        if self.ineligible_members.contains(&request.member_id) {
            return Ok(EligibilityResponse {
                eligible: false,
                payer_id: request.payer_id,
                reason: Some("Policy expired".to_string()),
                coverage: serde_json::Value::Null,
                requires_prior_auth: false,
                confidence: 0.95,
            });
        }

        let requires_prior_auth = request.proposed_services.iter().any(|service| {
            profile
                .prior_auth_prefixes
                .iter()
                .any(|prefix| service.starts_with(prefix))
        });

        Ok(EligibilityResponse {
            eligible: true,
            payer_id: request.payer_id,
            reason: None,
            coverage: json!({
                "payer_name": profile.name,
                "copay_amount": profile.copay_amount,
                "coverage_percentage": profile.coverage_percentage,
                "deductible_remaining": 500.0,
                "max_benefit": 100_000.0,
                "policy_status": "active",
            }),
            requires_prior_auth,
            confidence: 0.95,
        })
    }

    async fn submit_claim(
        &self,
        submission: ClaimSubmission,
    ) -> Result<SubmissionOutcome, PayerError> {
        self.check_outage()?;

        if Self::profile(&submission.payer_id).is_none() {
            return Ok(SubmissionOutcome {
                accepted: false,
                reference_number: None,
                tracking_number: None,
                rejection_reason: Some("Unknown payer".to_string()),
                estimated_processing_days: None,
            });
        }

        if submission.procedure_codes.is_empty() {
            return Ok(SubmissionOutcome {
                accepted: false,
                reference_number: None,
                tracking_number: None,
                rejection_reason: Some("Claim has no procedure codes".to_string()),
                estimated_processing_days: None,
            });
        }

        Ok(SubmissionOutcome {
            accepted: true,
            reference_number: Some(generate_reference("REF", 10)),
            tracking_number: Some(generate_reference("TRK", 8)),
            rejection_reason: None,
            estimated_processing_days: Some(7),
        })
    }
}
