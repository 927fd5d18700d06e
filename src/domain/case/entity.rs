//! Case state entity
//!
//! A case is one patient encounter, claim, or denial instance moving through
//! a workflow. Its state carries the append-only context log that serves as
//! the audit trail: every step attempt is appended, nothing is ever mutated
//! or removed.

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::error::EngineError;
use crate::domain::workflow::StepName;

/// Maximum length for case IDs
pub const MAX_CASE_ID_LENGTH: usize = 50;

/// Regex pattern for valid case IDs: alphanumeric and hyphens
static CASE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]$|^[a-zA-Z0-9]$").unwrap());

/// Validated case identifier, stable for the lifetime of the case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseId(String);

impl CaseId {
    /// Create a new validated case ID
    pub fn new(id: impl Into<String>) -> Result<Self, EngineError> {
        let id = id.into();
        validate_case_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh case ID
    pub fn generate() -> Self {
        Self(format!("case-{}", Uuid::new_v4()))
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CaseId {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CaseId> for String {
    fn from(id: CaseId) -> Self {
        id.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a case ID string
pub fn validate_case_id(id: &str) -> Result<(), EngineError> {
    if id.is_empty() {
        return Err(EngineError::validation("Case ID cannot be empty"));
    }

    if id.len() > MAX_CASE_ID_LENGTH {
        return Err(EngineError::validation(format!(
            "Case ID exceeds maximum length of {} characters",
            MAX_CASE_ID_LENGTH
        )));
    }

    if !CASE_ID_PATTERN.is_match(id) {
        return Err(EngineError::validation(format!(
            "Invalid case ID '{}': must be alphanumeric with hyphens, start and end with alphanumeric",
            id
        )));
    }

    Ok(())
}

/// The supported workflow pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    EncounterProcessing,
    ClaimsProcessing,
    DenialHandling,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 3] = [
        Self::EncounterProcessing,
        Self::ClaimsProcessing,
        Self::DenialHandling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EncounterProcessing => "encounter-processing",
            Self::ClaimsProcessing => "claims-processing",
            Self::DenialHandling => "denial-handling",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkflowKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "encounter-processing" => Ok(Self::EncounterProcessing),
            "claims-processing" => Ok(Self::ClaimsProcessing),
            "denial-handling" => Ok(Self::DenialHandling),
            other => Err(EngineError::invalid_workflow_kind(other)),
        }
    }
}

/// Case lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseStatus {
    InProgress,
    AwaitingHumanReview,
    Completed,
    Failed,
}

impl CaseStatus {
    /// Completed and failed are terminal; no further mutation is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Status transitions are monotonic except for the resume path
    /// awaiting-human-review -> in-progress.
    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        match (self, next) {
            (a, b) if *a == b => true,
            (Self::InProgress, _) => true,
            (Self::AwaitingHumanReview, Self::InProgress) => true,
            (Self::AwaitingHumanReview, Self::Completed) => true,
            (Self::AwaitingHumanReview, Self::Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::AwaitingHumanReview => "awaiting-human-review",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a recorded step attempt was disposed of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepDisposition {
    /// Confidence cleared the auto-approve threshold
    AutoApproved,
    /// A human reviewer confirmed the output
    HumanApproved,
    /// Escalated to human review
    Escalated,
    /// Retried after low confidence or tool unavailability
    Retried,
    /// Terminal failure of the step (and the case)
    Failed,
}

impl StepDisposition {
    /// Dispositions whose output is accepted as the step's result
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::AutoApproved | Self::HumanApproved)
    }
}

/// One entry in a case's append-only context log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    /// The step this attempt belongs to
    pub step: StepName,

    /// Attempt number for the step, starting at 1
    pub attempt: u32,

    /// Snapshot of the input handed to the tool adapter
    pub input: Value,

    /// Snapshot of the output (or error detail) produced by the attempt
    pub output: Value,

    /// Normalized confidence score for this attempt
    pub confidence: f64,

    /// How the sequencer disposed of the attempt
    pub disposition: StepDisposition,

    /// When the entry was recorded
    pub recorded_at: DateTime<Utc>,
}

impl ContextEntry {
    pub fn new(
        step: StepName,
        attempt: u32,
        input: Value,
        output: Value,
        confidence: f64,
        disposition: StepDisposition,
    ) -> Self {
        Self {
            step,
            attempt,
            input,
            output,
            confidence,
            disposition,
            recorded_at: Utc::now(),
        }
    }
}

/// The question posed to a human reviewer while a case is suspended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingReview {
    /// Step whose output needs confirmation
    pub step: StepName,

    /// Question presented to the reviewer
    pub question: String,

    /// Specific fields needing confirmation
    pub fields: Vec<String>,

    /// The ambiguous payload under review
    pub proposed: Value,

    /// When the review was requested
    pub requested_at: DateTime<Utc>,
}

impl PendingReview {
    pub fn new(
        step: StepName,
        question: impl Into<String>,
        fields: Vec<String>,
        proposed: Value,
    ) -> Self {
        Self {
            step,
            question: question.into(),
            fields,
            proposed,
            requested_at: Utc::now(),
        }
    }
}

/// Machine-readable failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCode {
    ToolUnavailable,
    LowConfidence,
    ValidationFailed,
    HumanRejected,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolUnavailable => "tool-unavailable",
            Self::LowConfidence => "low-confidence",
            Self::ValidationFailed => "validation-failed",
            Self::HumanRejected => "human-rejected",
        }
    }
}

/// Why a case reached the failed terminal state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub code: FailureCode,
    pub message: String,
}

impl FailureReason {
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Durable record of one case's progress through one workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseState {
    /// Stable case identifier
    id: CaseId,

    /// Which workflow pipeline this case runs
    kind: WorkflowKind,

    /// The step last entered
    current_step: StepName,

    /// Lifecycle status
    status: CaseStatus,

    /// Initial input the case was started with
    input: Value,

    /// Append-only audit log of all step attempts
    context: Vec<ContextEntry>,

    /// Retries already granted for the current step
    retries: u32,

    /// Present exactly when status = awaiting-human-review
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_review: Option<PendingReview>,

    /// Present exactly when status = failed
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<FailureReason>,

    /// Record version (increments on every persisted mutation)
    version: u32,

    /// When the case was created
    created_at: DateTime<Utc>,

    /// When the case was last updated
    updated_at: DateTime<Utc>,
}

impl CaseState {
    /// Create a new case at the initial step of its workflow
    pub fn new(id: CaseId, kind: WorkflowKind, first_step: StepName, input: Value) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            current_step: first_step,
            status: CaseStatus::InProgress,
            input,
            context: Vec::new(),
            retries: 0,
            pending_review: None,
            failure_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    // Getters

    pub fn id(&self) -> &CaseId {
        &self.id
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn current_step(&self) -> StepName {
        self.current_step
    }

    pub fn status(&self) -> CaseStatus {
        self.status
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn context(&self) -> &[ContextEntry] {
        &self.context
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Attempt number the next execution of the current step would carry
    pub fn next_attempt(&self) -> u32 {
        self.retries + 1
    }

    pub fn pending_review(&self) -> Option<&PendingReview> {
        self.pending_review.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        self.failure_reason.as_ref()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Latest accepted output per step, in workflow order of acceptance
    pub fn accepted_outputs(&self) -> serde_json::Map<String, Value> {
        let mut outputs = serde_json::Map::new();
        for entry in &self.context {
            if entry.disposition.is_accepted() {
                outputs.insert(entry.step.as_str().to_string(), entry.output.clone());
            }
        }
        outputs
    }

    // Mutations (sequencer-driven; all enforce the append-only and
    // monotonic-status invariants)

    /// Append a context entry. Rejected once the case is terminal.
    pub fn record(&mut self, entry: ContextEntry) -> Result<(), EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::invalid_state_transition(format!(
                "case '{}' is {}; context log is sealed",
                self.id, self.status
            )));
        }
        self.context.push(entry);
        self.touch();
        Ok(())
    }

    /// Move to the next step, resetting the retry counter
    pub fn advance_to(&mut self, next: StepName) -> Result<(), EngineError> {
        self.set_status(CaseStatus::InProgress)?;
        self.current_step = next;
        self.retries = 0;
        self.pending_review = None;
        self.touch();
        Ok(())
    }

    /// Mark the case completed (terminal)
    pub fn complete(&mut self) -> Result<(), EngineError> {
        self.set_status(CaseStatus::Completed)?;
        self.pending_review = None;
        self.touch();
        Ok(())
    }

    /// Suspend the case for human review
    pub fn suspend(&mut self, review: PendingReview) -> Result<(), EngineError> {
        self.set_status(CaseStatus::AwaitingHumanReview)?;
        self.pending_review = Some(review);
        self.touch();
        Ok(())
    }

    /// Resume after human input arrived
    pub fn resume(&mut self) -> Result<(), EngineError> {
        if self.status != CaseStatus::AwaitingHumanReview {
            return Err(EngineError::invalid_state_transition(format!(
                "case '{}' is {}, not awaiting-human-review",
                self.id, self.status
            )));
        }
        self.set_status(CaseStatus::InProgress)?;
        self.pending_review = None;
        self.touch();
        Ok(())
    }

    /// Grant one more retry of the current step
    pub fn note_retry(&mut self) -> Result<(), EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::invalid_state_transition(format!(
                "case '{}' is {}; cannot retry",
                self.id, self.status
            )));
        }
        self.retries += 1;
        self.touch();
        Ok(())
    }

    /// Mark the case failed (terminal) with a recorded reason
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), EngineError> {
        self.set_status(CaseStatus::Failed)?;
        self.pending_review = None;
        self.failure_reason = Some(reason);
        self.touch();
        Ok(())
    }

    /// Bump the record version; called by the orchestrator before each save
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    fn set_status(&mut self, next: CaseStatus) -> Result<(), EngineError> {
        if !self.status.can_transition_to(next) {
            return Err(EngineError::invalid_state_transition(format!(
                "case '{}': {} -> {} is not allowed",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_case() -> CaseState {
        CaseState::new(
            CaseId::new("case-1").unwrap(),
            WorkflowKind::EncounterProcessing,
            StepName::ParseInput,
            json!({"raw_input": "note"}),
        )
    }

    fn entry(disposition: StepDisposition) -> ContextEntry {
        ContextEntry::new(
            StepName::ParseInput,
            1,
            json!({}),
            json!({"segments": []}),
            0.9,
            disposition,
        )
    }

    #[test]
    fn test_case_id_valid() {
        assert!(CaseId::new("case-1").is_ok());
        assert!(CaseId::new("a").is_ok());
        assert!(CaseId::new("enc-2024-0001").is_ok());
    }

    #[test]
    fn test_case_id_invalid() {
        assert!(CaseId::new("").is_err());
        assert!(CaseId::new("-leading").is_err());
        assert!(CaseId::new("trailing-").is_err());
        assert!(CaseId::new("has spaces").is_err());

        let long_id = "a".repeat(51);
        assert!(CaseId::new(long_id).is_err());
    }

    #[test]
    fn test_case_id_generate_is_valid() {
        let id = CaseId::generate();
        assert!(validate_case_id(id.as_str()).is_ok());
    }

    #[test]
    fn test_workflow_kind_round_trip() {
        for kind in WorkflowKind::ALL {
            let parsed: WorkflowKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }

        let err = "batch-billing".parse::<WorkflowKind>().unwrap_err();
        assert!(err.to_string().contains("batch-billing"));
    }

    #[test]
    fn test_status_transitions() {
        use CaseStatus::*;

        assert!(InProgress.can_transition_to(AwaitingHumanReview));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Failed));
        assert!(AwaitingHumanReview.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Failed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Failed));
    }

    #[test]
    fn test_record_appends() {
        let mut case = new_case();
        assert!(case.context().is_empty());

        case.record(entry(StepDisposition::AutoApproved)).unwrap();
        case.record(entry(StepDisposition::Retried)).unwrap();
        assert_eq!(case.context().len(), 2);
    }

    #[test]
    fn test_record_rejected_after_terminal() {
        let mut case = new_case();
        case.record(entry(StepDisposition::AutoApproved)).unwrap();
        case.complete().unwrap();

        let result = case.record(entry(StepDisposition::AutoApproved));
        assert!(result.is_err());
        assert_eq!(case.context().len(), 1);
    }

    #[test]
    fn test_suspend_and_resume() {
        let mut case = new_case();
        case.suspend(PendingReview::new(
            StepName::SuggestCodes,
            "Approve these codes?",
            vec!["icd10_codes".to_string()],
            json!({"icd10_codes": []}),
        ))
        .unwrap();

        assert_eq!(case.status(), CaseStatus::AwaitingHumanReview);
        assert!(case.pending_review().is_some());

        case.resume().unwrap();
        assert_eq!(case.status(), CaseStatus::InProgress);
        assert!(case.pending_review().is_none());
    }

    #[test]
    fn test_resume_requires_awaiting_review() {
        let mut case = new_case();
        assert!(case.resume().is_err());

        case.complete().unwrap();
        assert!(case.resume().is_err());
    }

    #[test]
    fn test_advance_resets_retries() {
        let mut case = new_case();
        case.note_retry().unwrap();
        case.note_retry().unwrap();
        assert_eq!(case.retries(), 2);
        assert_eq!(case.next_attempt(), 3);

        case.advance_to(StepName::ExtractPatientInfo).unwrap();
        assert_eq!(case.retries(), 0);
        assert_eq!(case.current_step(), StepName::ExtractPatientInfo);
    }

    #[test]
    fn test_fail_records_reason() {
        let mut case = new_case();
        case.fail(FailureReason::new(
            FailureCode::ToolUnavailable,
            "eligibility lookup unavailable after 3 attempts",
        ))
        .unwrap();

        assert_eq!(case.status(), CaseStatus::Failed);
        let reason = case.failure_reason().unwrap();
        assert_eq!(reason.code, FailureCode::ToolUnavailable);
        assert!(reason.message.contains("unavailable"));

        // failed is terminal
        assert!(case.advance_to(StepName::SuggestCodes).is_err());
    }

    #[test]
    fn test_accepted_outputs_keeps_latest_per_step() {
        let mut case = new_case();
        case.record(ContextEntry::new(
            StepName::ParseInput,
            1,
            json!({}),
            json!({"v": 1}),
            0.4,
            StepDisposition::Retried,
        ))
        .unwrap();
        case.record(ContextEntry::new(
            StepName::ParseInput,
            2,
            json!({}),
            json!({"v": 2}),
            0.95,
            StepDisposition::AutoApproved,
        ))
        .unwrap();

        let outputs = case.accepted_outputs();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs["parse-input"], json!({"v": 2}));
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut case = new_case();
        case.record(entry(StepDisposition::AutoApproved)).unwrap();

        let json = serde_json::to_string(&case).unwrap();
        assert!(json.contains("\"encounter-processing\""));
        assert!(json.contains("\"in-progress\""));

        let back: CaseState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id().as_str(), "case-1");
        assert_eq!(back.context().len(), 1);
    }
}
