//! Tool adapter domain module

mod adapter;
mod registry;

pub use adapter::{
    Capability, CandidateOutput, ConfidenceSignals, StepInput, ToolAdapter, ToolError,
    ToolResponse, ValidationIssue,
};
pub use registry::AdapterRegistry;
