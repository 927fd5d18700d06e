//! Payer collaborator contract
//!
//! Domain lookups against insurance payers: eligibility verification and
//! claim submission. Synchronous request/response with a bounded timeout;
//! any transport or payer-side failure surfaces as `Unavailable` and is
//! handled by the retry policy, never by the caller.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Eligibility verification request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityRequest {
    /// Payer identifier (e.g. "DAMAN")
    pub payer_id: String,

    /// Member / policy number with the payer
    pub member_id: String,

    /// Date of service the verification applies to
    pub service_date: NaiveDate,

    /// Proposed procedure and diagnosis codes
    #[serde(default)]
    pub proposed_services: Vec<String>,
}

/// Eligibility verification response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub eligible: bool,

    pub payer_id: String,

    /// Reason when ineligible
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Coverage details when eligible (copay, deductible, coverage share)
    #[serde(default)]
    pub coverage: Value,

    pub requires_prior_auth: bool,

    /// Payer-reported confidence in the verification
    pub confidence: f64,
}

/// Claim submission request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimSubmission {
    pub claim_number: String,
    pub payer_id: String,
    pub total_amount: f64,
    pub patient_responsibility: f64,
    pub diagnosis_codes: Vec<Value>,
    pub procedure_codes: Vec<Value>,
}

/// Outcome of a claim submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub accepted: bool,

    /// Payer reference number when accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,

    /// Tracking number when accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,

    /// Rejection reason when not accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    /// Estimated processing time in days
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_processing_days: Option<u32>,
}

/// Failures of the payer collaborator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PayerError {
    #[error("Payer unavailable: {0}")]
    Unavailable(String),
}

impl PayerError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Trait for payer gateways
#[async_trait]
pub trait PayerGateway: Send + Sync + std::fmt::Debug {
    /// Verify coverage for a member on a service date
    async fn check_eligibility(
        &self,
        request: EligibilityRequest,
    ) -> Result<EligibilityResponse, PayerError>;

    /// Submit an assembled claim
    async fn submit_claim(
        &self,
        submission: ClaimSubmission,
    ) -> Result<SubmissionOutcome, PayerError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility_response_serialization() {
        let response = EligibilityResponse {
            eligible: false,
            payer_id: "DAMAN".to_string(),
            reason: Some("Policy expired".to_string()),
            coverage: Value::Null,
            requires_prior_auth: false,
            confidence: 0.95,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("Policy expired"));

        let back: EligibilityResponse = serde_json::from_str(&json).unwrap();
        assert!(!back.eligible);
        assert_eq!(back.payer_id, "DAMAN");
    }
}
