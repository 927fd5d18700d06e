//! Case domain module
//!
//! A case is the unit of work the engine orchestrates: one encounter, claim,
//! or denial moving through a named workflow. The entity enforces the two
//! structural invariants the rest of the engine relies on: the context log is
//! append-only, and status transitions are monotonic apart from the
//! review-resume path.

mod entity;
pub mod repository;

pub use entity::{
    validate_case_id, CaseId, CaseState, CaseStatus, ContextEntry, FailureCode, FailureReason,
    PendingReview, StepDisposition, WorkflowKind, MAX_CASE_ID_LENGTH,
};
pub use repository::CaseRepository;
