//! Domain layer - core orchestration logic and collaborator contracts

pub mod case;
pub mod error;
pub mod payer;
pub mod reasoning;
pub mod tool;
pub mod workflow;

pub use case::{
    CaseId, CaseRepository, CaseState, CaseStatus, ContextEntry, FailureCode, FailureReason,
    PendingReview, StepDisposition, WorkflowKind,
};
pub use error::EngineError;
pub use payer::{
    ClaimSubmission, EligibilityRequest, EligibilityResponse, PayerError, PayerGateway,
    SubmissionOutcome,
};
pub use reasoning::{Completion, CompletionRequest, ReasoningError, ReasoningProvider};
pub use tool::{
    AdapterRegistry, CandidateOutput, Capability, ConfidenceSignals, StepInput, ToolAdapter,
    ToolError, ToolResponse, ValidationIssue,
};
pub use workflow::{
    ConfidenceEvaluator, ConfidencePolicy, PolicyTable, Provenance, StepName, StepResult,
    StepSequencer, Transition, WorkflowDefinition, WorkflowRegistry,
};
