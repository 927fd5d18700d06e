use thiserror::Error;

/// Core engine errors surfaced to callers of the orchestrator.
///
/// Transient collaborator failures (reasoning timeouts, payer outages) are
/// never represented here: they are retried per policy and, once exhausted,
/// fold into a `failed` case state with a recorded reason.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown workflow kind: {kind}")]
    InvalidWorkflowKind { kind: String },

    #[error("Invalid state transition: {message}")]
    InvalidStateTransition { message: String },

    #[error("Case not found: {case_id}")]
    CaseNotFound { case_id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn invalid_workflow_kind(kind: impl Into<String>) -> Self {
        Self::InvalidWorkflowKind { kind: kind.into() }
    }

    pub fn invalid_state_transition(message: impl Into<String>) -> Self {
        Self::InvalidStateTransition {
            message: message.into(),
        }
    }

    pub fn case_not_found(case_id: impl Into<String>) -> Self {
        Self::CaseNotFound {
            case_id: case_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::invalid_workflow_kind("batch-billing");
        assert_eq!(err.to_string(), "Unknown workflow kind: batch-billing");

        let err = EngineError::invalid_state_transition("case is completed");
        assert_eq!(
            err.to_string(),
            "Invalid state transition: case is completed"
        );

        let err = EngineError::case_not_found("case-123");
        assert_eq!(err.to_string(), "Case not found: case-123");
    }
}
