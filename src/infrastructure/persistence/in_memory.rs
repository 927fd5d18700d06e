//! In-memory case repository implementation
//!
//! Saves clone the full state under the case id, so each save is an atomic
//! overwrite of the whole record.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{CaseId, CaseRepository, CaseState, EngineError};

/// In-memory implementation of CaseRepository
#[derive(Debug)]
pub struct InMemoryCaseRepository {
    cases: Arc<RwLock<HashMap<String, CaseState>>>,
}

impl InMemoryCaseRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self {
            cases: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCaseRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn load(&self, id: &CaseId) -> Result<Option<CaseState>, EngineError> {
        let cases = self.cases.read().await;
        Ok(cases.get(id.as_str()).cloned())
    }

    async fn save(&self, state: &CaseState) -> Result<(), EngineError> {
        let mut cases = self.cases.write().await;
        cases.insert(state.id().as_str().to_string(), state.clone());
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<CaseId>, EngineError> {
        let cases = self.cases.read().await;
        cases
            .keys()
            .map(|k| CaseId::new(k.clone()))
            .collect::<Result<Vec<_>, _>>()
    }
}
