//! Reasoning collaborator contract
//!
//! The opaque language-model capability: given a prompt and context, return
//! a free-text or structured completion. No determinism is guaranteed across
//! calls; transient failures (timeout, capacity) are expected and mapped to
//! the retry path by the adapters that consume this trait.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A reasoning request: a system instruction plus user content
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instruction framing the task
    pub system: String,

    /// User content (the case material)
    pub user: String,

    /// Sampling temperature, if the provider supports it
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A reasoning completion
#[derive(Debug, Clone)]
pub enum Completion {
    /// Free-text completion
    Text(String),

    /// Structured payload (providers that return parsed JSON directly)
    Structured(Value),
}

impl Completion {
    /// The completion as text; structured payloads are serialized
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }
}

/// Failures of the reasoning collaborator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReasoningError {
    #[error("Reasoning call timed out")]
    Timeout,

    #[error("Reasoning capacity exceeded")]
    CapacityExceeded,

    #[error("Reasoning provider error: {0}")]
    Provider(String),
}

impl ReasoningError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}

/// Trait for reasoning providers
#[async_trait]
pub trait ReasoningProvider: Send + Sync + std::fmt::Debug {
    /// Execute one completion request
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ReasoningError>;

    /// Provider name for logs
    fn provider_name(&self) -> &'static str;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_as_text() {
        let text = Completion::Text("hello".to_string());
        assert_eq!(text.as_text(), "hello");

        let structured = Completion::Structured(serde_json::json!({"a": 1}));
        assert_eq!(structured.as_text(), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_mock_provider_queue() {
        use mock::MockReasoningProvider;

        let provider = MockReasoningProvider::new()
            .with_text("first")
            .with_error(ReasoningError::Timeout);

        let request = CompletionRequest::new("system", "user");
        let first = provider.complete(request.clone()).await.unwrap();
        assert_eq!(first.as_text(), "first");

        let second = provider.complete(request.clone()).await;
        assert_eq!(second.unwrap_err(), ReasoningError::Timeout);

        let drained = provider.complete(request).await;
        assert!(matches!(drained, Err(ReasoningError::Provider(_))));
    }
}
