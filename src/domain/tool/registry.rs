//! Adapter registry
//!
//! Maps step names to the registered adapter implementing them. Workflow
//! kinds are composed from this open-ended set; the same adapter instance may
//! serve several steps (the store adapter backs both terminal store steps).

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::error::EngineError;
use crate::domain::workflow::StepName;

use super::adapter::ToolAdapter;

/// Registry of step-name -> adapter bindings, immutable after startup
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<StepName, Arc<dyn ToolAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an adapter to a step name
    pub fn register(mut self, step: StepName, adapter: Arc<dyn ToolAdapter>) -> Self {
        self.adapters.insert(step, adapter);
        self
    }

    /// Look up the adapter for a step
    pub fn get(&self, step: StepName) -> Result<Arc<dyn ToolAdapter>, EngineError> {
        self.adapters.get(&step).cloned().ok_or_else(|| {
            EngineError::configuration(format!("no adapter registered for step '{}'", step))
        })
    }

    /// Verify every step of every definition has an adapter
    pub fn verify_coverage(
        &self,
        registry: &crate::domain::workflow::WorkflowRegistry,
    ) -> Result<(), EngineError> {
        for kind in registry.kinds() {
            for step in registry.definition(kind)?.steps() {
                if !self.adapters.contains_key(step) {
                    return Err(EngineError::configuration(format!(
                        "workflow '{}' uses step '{}' but no adapter is registered for it",
                        kind, step
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tool::adapter::{
        Capability, ConfidenceSignals, StepInput, ToolError, ToolResponse,
    };
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Debug)]
    struct NoopAdapter;

    #[async_trait]
    impl ToolAdapter for NoopAdapter {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn capabilities(&self) -> &'static [Capability] {
            &[Capability::RulesOnly]
        }

        async fn execute(&self, _input: StepInput) -> Result<ToolResponse, ToolError> {
            Ok(ToolResponse::new(json!({}), ConfidenceSignals::rules(1.0)))
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = AdapterRegistry::new().register(StepName::ParseInput, Arc::new(NoopAdapter));

        assert!(registry.get(StepName::ParseInput).is_ok());
        assert!(registry.get(StepName::SuggestCodes).is_err());
    }

    #[test]
    fn test_verify_coverage_reports_missing() {
        let workflows = crate::domain::workflow::WorkflowRegistry::standard();
        let adapters =
            AdapterRegistry::new().register(StepName::ParseInput, Arc::new(NoopAdapter));

        let err = adapters.verify_coverage(&workflows).unwrap_err();
        assert!(err.to_string().contains("no adapter is registered"));
    }

    #[test]
    fn test_full_coverage_passes() {
        let workflows = crate::domain::workflow::WorkflowRegistry::standard();
        let mut adapters = AdapterRegistry::new();
        for kind in workflows.kinds() {
            for step in workflows.definition(kind).unwrap().steps() {
                adapters = adapters.register(*step, Arc::new(NoopAdapter));
            }
        }

        assert!(adapters.verify_coverage(&workflows).is_ok());
    }
}
