//! Infrastructure layer - collaborator implementations and tool adapters

pub mod adapters;
pub mod payer;
pub mod persistence;
pub mod reasoning;

pub use adapters::{
    AnalyzeDenialAdapter, AssembleClaimAdapter, CheckEligibilityAdapter, ClassifyDenialAdapter,
    DraftAppealAdapter, ExtractPatientInfoAdapter, ParseInputAdapter, StoreResultAdapter,
    SubmitClaimAdapter, SuggestCodesAdapter, ValidateStandardizeAdapter,
};
pub use payer::MockPayerGateway;
pub use persistence::InMemoryCaseRepository;
pub use reasoning::{HttpReasoningProvider, ScriptedReasoning};
