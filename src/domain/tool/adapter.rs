//! Tool adapter trait and result types
//!
//! Adapters are the engine's only way of doing domain work. Each one exposes
//! the same narrow capability: given a step input, produce a response with
//! raw confidence signals. The sequencer never depends on concrete adapter
//! types, only on the step name it looks up in the registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::case::{CaseId, WorkflowKind};
use crate::domain::workflow::StepName;

/// External capabilities an adapter declares it requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Needs the opaque reasoning collaborator
    Reasoning,
    /// Needs eligibility lookups against a payer
    EligibilityLookup,
    /// Needs claim submission against a payer
    ClaimSubmission,
    /// Deterministic business rules only
    RulesOnly,
}

/// Input handed to a tool adapter for one step attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInput {
    /// Case being processed
    pub case: CaseId,

    /// Workflow the case runs
    pub kind: WorkflowKind,

    /// Step to execute
    pub step: StepName,

    /// Attempt number, starting at 1; adapters may adjust their prompt on
    /// retries (e.g. a clarifying re-prompt)
    pub attempt: u32,

    /// The initial input the case was started with
    pub input: Value,

    /// Accepted outputs of prior steps, keyed by step name
    pub prior: serde_json::Map<String, Value>,
}

impl StepInput {
    /// Accepted output of a prior step, if present
    pub fn prior_output(&self, step: StepName) -> Option<&Value> {
        self.prior.get(step.as_str())
    }

    /// A field of the initial input
    pub fn input_field(&self, field: &str) -> Option<&Value> {
        self.input.get(field)
    }
}

/// Raw confidence signals reported by a tool.
///
/// Heterogeneous by design: a reasoning-backed adapter reports what the model
/// claimed, a rules-backed adapter reports match completeness, and most also
/// report a cross-field consistency measure. The evaluator collapses whatever
/// subset is present into the single [0, 1] score the sequencer gates on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSignals {
    /// Model-reported probability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<f64>,

    /// Rule-match completeness (e.g. required-field coverage)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_match: Option<f64>,

    /// Cross-field consistency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<f64>,
}

impl ConfidenceSignals {
    pub fn model(value: f64) -> Self {
        Self {
            model: Some(value),
            ..Default::default()
        }
    }

    pub fn rules(value: f64) -> Self {
        Self {
            rule_match: Some(value),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, value: f64) -> Self {
        self.model = Some(value);
        self
    }

    pub fn with_rule_match(mut self, value: f64) -> Self {
        self.rule_match = Some(value);
        self
    }

    pub fn with_consistency(mut self, value: f64) -> Self {
        self.consistency = Some(value);
        self
    }
}

/// A structural problem with a tool's output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Field the issue concerns
    pub field: String,

    /// Human-readable description
    pub message: String,

    /// Blocking issues force the retry path regardless of confidence
    pub blocking: bool,
}

impl ValidationIssue {
    pub fn blocking(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            blocking: true,
        }
    }

    pub fn advisory(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            blocking: false,
        }
    }
}

/// One of several alternative outputs a step may produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateOutput {
    /// The candidate payload
    pub payload: Value,

    /// Signals for this candidate
    pub signals: ConfidenceSignals,

    /// Tool-declared preference rank (lower is preferred); used to break
    /// score ties deterministically, never map iteration order
    pub preference: u32,
}

/// What a tool adapter returns for one attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// The produced payload
    pub payload: Value,

    /// Raw confidence signals for the payload
    pub signals: ConfidenceSignals,

    /// Structural issues found in the output
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,

    /// Alternative outputs, when the step produced several
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<CandidateOutput>,
}

impl ToolResponse {
    pub fn new(payload: Value, signals: ConfidenceSignals) -> Self {
        Self {
            payload,
            signals,
            issues: Vec::new(),
            candidates: Vec::new(),
        }
    }

    pub fn with_issue(mut self, issue: ValidationIssue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_issues(mut self, issues: Vec<ValidationIssue>) -> Self {
        self.issues.extend(issues);
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<CandidateOutput>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn has_blocking_issues(&self) -> bool {
        self.issues.iter().any(|i| i.blocking)
    }
}

/// Errors a tool adapter can fail with
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    /// Transient collaborator failure (reasoning timeout, payer outage).
    /// The sequencer treats this like a zero-confidence result for retry
    /// purposes, then fails the case with a distinguishable reason code.
    #[error("Tool unavailable: {0}")]
    Unavailable(String),
}

impl ToolError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// The single capability interface every adapter implements
#[async_trait]
pub trait ToolAdapter: Send + Sync + std::fmt::Debug {
    /// Stable adapter name (for logs and audit entries)
    fn name(&self) -> &'static str;

    /// External capabilities this adapter requires
    fn capabilities(&self) -> &'static [Capability];

    /// Execute one step attempt
    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError>;
}
