//! Case repository trait
//!
//! Persistence collaborator for case states. Implementations must overwrite
//! the full record atomically: the context log's completeness is the audit
//! guarantee, so a partially written state is worse than a failed write.

use async_trait::async_trait;

use super::entity::{CaseId, CaseState};
use crate::domain::error::EngineError;

/// Repository trait for case state persistence
#[async_trait]
pub trait CaseRepository: Send + Sync + std::fmt::Debug {
    /// Load a case by ID
    async fn load(&self, id: &CaseId) -> Result<Option<CaseState>, EngineError>;

    /// Save (atomically overwrite) a case state
    async fn save(&self, state: &CaseState) -> Result<(), EngineError>;

    /// List all known case IDs
    async fn list_ids(&self) -> Result<Vec<CaseId>, EngineError>;
}
