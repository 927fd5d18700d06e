//! HTTP reasoning provider
//!
//! Talks to any OpenAI-compatible chat-completions endpoint. Timeouts and
//! capacity responses map onto the reasoning error taxonomy so adapters can
//! fold them into the retry path.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::domain::{Completion, CompletionRequest, ReasoningError, ReasoningProvider};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Reasoning provider backed by an OpenAI-compatible HTTP API
#[derive(Debug)]
pub struct HttpReasoningProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpReasoningProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, ReasoningError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ReasoningError::provider(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl ReasoningProvider for HttpReasoningProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ReasoningError> {
        let response = self
            .client
            .post(self.chat_completions_url())
            .bearer_auth(&self.api_key)
            .json(&self.build_body(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasoningError::Timeout
                } else {
                    ReasoningError::provider(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ReasoningError::CapacityExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::provider(format!(
                "status {status}: {body}"
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::provider(format!("response decode: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ReasoningError::provider("completion had no content"))?;

        Ok(Completion::Text(content))
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}
