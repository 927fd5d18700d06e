//! Store adapter
//!
//! Terminal step of every workflow: folds the accepted artifacts into one
//! summary payload for the external data layer to archive. Deterministic;
//! registered under both `store-encounter` and `record-outcome`.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::domain::{
    Capability, ConfidenceSignals, StepInput, ToolAdapter, ToolError, ToolResponse,
};

#[derive(Debug, Default)]
pub struct StoreResultAdapter;

impl StoreResultAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolAdapter for StoreResultAdapter {
    fn name(&self) -> &'static str {
        "store-result"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::RulesOnly]
    }

    async fn execute(&self, input: StepInput) -> Result<ToolResponse, ToolError> {
        let payload = json!({
            "case": input.case,
            "workflow": input.kind,
            "artifacts": Value::Object(input.prior.clone()),
            "stored_at": Utc::now().to_rfc3339(),
        });

        Ok(ToolResponse::new(
            payload,
            ConfidenceSignals::rules(1.0).with_consistency(1.0),
        ))
    }
}
