//! Scripted reasoning provider
//!
//! Serves canned completions in order. Used by the offline CLI mode and by
//! tests that need a full workflow run without a live model endpoint.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{Completion, CompletionRequest, ReasoningError, ReasoningProvider};

/// Reasoning provider that replays a fixed script of completions
#[derive(Debug, Default)]
pub struct ScriptedReasoning {
    script: Mutex<VecDeque<String>>,
}

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered list of completions
    pub fn from_script(script: Vec<String>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }

    pub fn push(&self, completion: impl Into<String>) {
        self.script.lock().unwrap().push_back(completion.into());
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedReasoning {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, ReasoningError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .map(Completion::Text)
            .ok_or_else(|| ReasoningError::provider("scripted completions exhausted"))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
