//! Step sequencer
//!
//! The state machine at the heart of the engine: given a case state and the
//! scored result of the step that just ran, compute the next transition and
//! apply it. Both halves are synchronous and free of I/O so the machine is
//! unit-testable with injected step results, without any real tool adapters.

use serde_json::{json, Value};

use crate::domain::case::{
    CaseState, ContextEntry, FailureCode, FailureReason, PendingReview, StepDisposition,
};
use crate::domain::error::EngineError;
use crate::domain::workflow::evaluator::{Provenance, StepResult};
use crate::domain::workflow::policy::PolicyTable;
use crate::domain::workflow::{StepName, WorkflowRegistry};

/// The transition the sequencer selected for a step result
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Accept the output and move on; `None` means the workflow is complete
    Advance { next: Option<StepName> },

    /// Suspend the case and pose a question to a human reviewer
    Suspend { review: PendingReview },

    /// Re-invoke the same step; `attempt` is the next attempt number
    Retry { attempt: u32 },

    /// Terminal failure with a recorded reason
    Fail { reason: FailureReason },
}

/// The sequencer: transition decisions plus their application to case state
#[derive(Debug, Clone)]
pub struct StepSequencer {
    workflows: WorkflowRegistry,
    policies: PolicyTable,
}

impl StepSequencer {
    pub fn new(workflows: WorkflowRegistry, policies: PolicyTable) -> Self {
        Self {
            workflows,
            policies,
        }
    }

    pub fn workflows(&self) -> &WorkflowRegistry {
        &self.workflows
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Decide the transition for a step result.
    ///
    /// Gate boundaries are inclusive at the lower end: confidence equal to
    /// the auto-approve threshold advances, confidence equal to the
    /// human-review threshold escalates. Blocking validation issues force
    /// the retry path regardless of the reported confidence.
    pub fn decide(&self, state: &CaseState, result: &StepResult) -> Result<Transition, EngineError> {
        let step = state.current_step();
        let policy = self.policies.for_step(step);
        let attempts_so_far = state.next_attempt();

        if result.has_blocking_issues() || result.confidence < policy.human_review() {
            if state.retries() < policy.max_retries() {
                return Ok(Transition::Retry {
                    attempt: attempts_so_far + 1,
                });
            }
            return Ok(Transition::Fail {
                reason: self.failure_reason(result, &policy, attempts_so_far),
            });
        }

        if result.confidence >= policy.auto_approve() {
            let definition = self.workflows.definition(state.kind())?;
            return Ok(Transition::Advance {
                next: definition.next_after(step)?,
            });
        }

        // human_review <= confidence < auto_approve
        Ok(Transition::Suspend {
            review: self.build_review(result),
        })
    }

    /// Apply a transition: append the audit entry, then mutate status,
    /// current step, and retry counter under the state's invariant checks.
    pub fn apply(
        &self,
        state: &mut CaseState,
        input: Value,
        result: StepResult,
        transition: Transition,
    ) -> Result<(), EngineError> {
        let disposition = match (&transition, result.provenance) {
            (Transition::Advance { .. }, Provenance::Human) => StepDisposition::HumanApproved,
            (Transition::Advance { .. }, _) => StepDisposition::AutoApproved,
            (Transition::Suspend { .. }, _) => StepDisposition::Escalated,
            (Transition::Retry { .. }, _) => StepDisposition::Retried,
            (Transition::Fail { .. }, _) => StepDisposition::Failed,
        };

        let output = if result.issues.is_empty() {
            result.payload.clone()
        } else {
            json!({
                "payload": result.payload,
                "issues": result.issues,
            })
        };

        let attempt = state.next_attempt();
        state.record(ContextEntry::new(
            result.step,
            attempt,
            input,
            output,
            result.confidence,
            disposition,
        ))?;

        match transition {
            Transition::Advance { next } => match next {
                Some(next) => state.advance_to(next)?,
                None => state.complete()?,
            },
            Transition::Suspend { review } => state.suspend(review)?,
            Transition::Retry { .. } => state.note_retry()?,
            Transition::Fail { reason } => state.fail(reason)?,
        }

        Ok(())
    }

    /// Record an explicit human rejection as a terminal failure.
    pub fn apply_rejection(
        &self,
        state: &mut CaseState,
        reason: impl Into<String>,
    ) -> Result<(), EngineError> {
        let reason = reason.into();
        let step = state.current_step();
        let attempt = state.next_attempt();
        state.record(ContextEntry::new(
            step,
            attempt,
            Value::Null,
            json!({"rejected": true, "reason": reason.clone()}),
            1.0,
            StepDisposition::Failed,
        ))?;
        state.fail(FailureReason::new(FailureCode::HumanRejected, reason))
    }

    fn build_review(&self, result: &StepResult) -> PendingReview {
        let mut fields: Vec<String> = result
            .issues
            .iter()
            .map(|issue| issue.field.clone())
            .collect();

        if fields.is_empty() {
            if let Value::Object(map) = &result.payload {
                fields = map.keys().cloned().collect();
            }
        }

        PendingReview::new(
            result.step,
            format!(
                "Step '{}' produced a result with confidence {:.2}; please confirm or correct it.",
                result.step, result.confidence
            ),
            fields,
            result.payload.clone(),
        )
    }

    fn failure_reason(
        &self,
        result: &StepResult,
        policy: &crate::domain::workflow::ConfidencePolicy,
        attempts: u32,
    ) -> FailureReason {
        let detail = || {
            result
                .issues
                .iter()
                .map(|i| i.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        };

        match result.provenance {
            Provenance::Unavailable => FailureReason::new(
                FailureCode::ToolUnavailable,
                format!(
                    "step '{}' tool unavailable after {} attempts: {}",
                    result.step,
                    attempts,
                    detail()
                ),
            ),
            _ if result.has_blocking_issues() => FailureReason::new(
                FailureCode::ValidationFailed,
                format!(
                    "step '{}' output failed validation after {} attempts: {}",
                    result.step,
                    attempts,
                    detail()
                ),
            ),
            _ => FailureReason::new(
                FailureCode::LowConfidence,
                format!(
                    "step '{}' confidence {:.2} stayed below the review threshold {:.2} after {} attempts",
                    result.step,
                    result.confidence,
                    policy.human_review(),
                    attempts
                ),
            ),
        }
    }
}
