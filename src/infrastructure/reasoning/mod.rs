//! Reasoning provider implementations

mod http;
mod scripted;

pub use http::HttpReasoningProvider;
pub use scripted::ScriptedReasoning;
