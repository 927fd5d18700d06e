//! Confidence policy configuration
//!
//! Per-step thresholds controlling the sequencer's gate. Loaded once at
//! process start and immutable afterwards; the orchestrator receives the
//! table explicitly so tests can inject their own.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;
use crate::domain::workflow::StepName;

/// Thresholds and retry budget for one step kind.
///
/// Invariant: `auto_approve >= human_review`, both within [0, 1]. Both bounds
/// are inclusive at the lower end: a score equal to `auto_approve` is
/// auto-approved, a score equal to `human_review` is escalated (not retried).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConfidencePolicy")]
pub struct ConfidencePolicy {
    auto_approve: f64,
    human_review: f64,
    max_retries: u32,
}

/// Unvalidated shape used for deserialization
#[derive(Debug, Clone, Copy, Deserialize)]
struct RawConfidencePolicy {
    auto_approve: f64,
    human_review: f64,
    max_retries: u32,
}

impl TryFrom<RawConfidencePolicy> for ConfidencePolicy {
    type Error = EngineError;

    fn try_from(raw: RawConfidencePolicy) -> Result<Self, Self::Error> {
        Self::new(raw.auto_approve, raw.human_review, raw.max_retries)
    }
}

impl ConfidencePolicy {
    pub fn new(auto_approve: f64, human_review: f64, max_retries: u32) -> Result<Self, EngineError> {
        if !(0.0..=1.0).contains(&auto_approve) || !(0.0..=1.0).contains(&human_review) {
            return Err(EngineError::configuration(format!(
                "confidence thresholds must lie in [0, 1], got auto_approve={auto_approve}, human_review={human_review}"
            )));
        }

        if auto_approve < human_review {
            return Err(EngineError::configuration(format!(
                "auto_approve ({auto_approve}) must be >= human_review ({human_review})"
            )));
        }

        Ok(Self {
            auto_approve,
            human_review,
            max_retries,
        })
    }

    pub fn auto_approve(&self) -> f64 {
        self.auto_approve
    }

    pub fn human_review(&self) -> f64 {
        self.human_review
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            auto_approve: 0.9,
            human_review: 0.6,
            max_retries: 2,
        }
    }
}

/// Per-step policy table with a default fallback
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    default: ConfidencePolicy,
    overrides: HashMap<StepName, ConfidencePolicy>,
}

impl PolicyTable {
    pub fn new(default: ConfidencePolicy) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, step: StepName, policy: ConfidencePolicy) -> Self {
        self.overrides.insert(step, policy);
        self
    }

    pub fn with_overrides(mut self, overrides: HashMap<StepName, ConfidencePolicy>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn for_step(&self, step: StepName) -> ConfidencePolicy {
        self.overrides.get(&step).copied().unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_validation() {
        assert!(ConfidencePolicy::new(0.9, 0.6, 2).is_ok());
        assert!(ConfidencePolicy::new(0.8, 0.8, 0).is_ok());

        // auto_approve below human_review violates the invariant
        assert!(ConfidencePolicy::new(0.5, 0.8, 2).is_err());

        // out-of-range thresholds
        assert!(ConfidencePolicy::new(1.5, 0.5, 2).is_err());
        assert!(ConfidencePolicy::new(0.9, -0.1, 2).is_err());
    }

    #[test]
    fn test_policy_deserialization_rejects_invalid() {
        let ok: Result<ConfidencePolicy, _> =
            serde_json::from_str(r#"{"auto_approve": 0.9, "human_review": 0.5, "max_retries": 2}"#);
        assert!(ok.is_ok());

        let bad: Result<ConfidencePolicy, _> =
            serde_json::from_str(r#"{"auto_approve": 0.4, "human_review": 0.5, "max_retries": 2}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_table_override() {
        let strict = ConfidencePolicy::new(0.95, 0.8, 1).unwrap();
        let table = PolicyTable::new(ConfidencePolicy::default())
            .with_override(StepName::SuggestCodes, strict);

        assert_eq!(table.for_step(StepName::SuggestCodes), strict);
        assert_eq!(
            table.for_step(StepName::ParseInput),
            ConfidencePolicy::default()
        );
    }
}
