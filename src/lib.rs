//! RCM Engine
//!
//! AI workflow orchestration for healthcare revenue cycle management:
//! - Three case pipelines: encounter processing, claims processing, denial
//!   handling, each an ordered sequence of named steps
//! - Confidence-gated control flow: every step result is scored and either
//!   auto-approved, escalated to a human reviewer, or retried
//! - An append-only per-case context log as the audit trail
//! - Suspend/resume around human review, with per-case serialized execution

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod orchestrator;

pub use config::AppConfig;

use std::sync::Arc;

use domain::{
    AdapterRegistry, CaseRepository, EngineError, PayerGateway, PolicyTable, ReasoningProvider,
    StepName, StepSequencer, WorkflowRegistry,
};
use infrastructure::{
    AnalyzeDenialAdapter, AssembleClaimAdapter, CheckEligibilityAdapter, ClassifyDenialAdapter,
    DraftAppealAdapter, ExtractPatientInfoAdapter, ParseInputAdapter, StoreResultAdapter,
    SubmitClaimAdapter, SuggestCodesAdapter, ValidateStandardizeAdapter,
};
use orchestrator::{Orchestrator, OrchestratorConfig};

/// Wire up an orchestrator with the standard workflow definitions and the
/// full adapter set, verifying that every step has an adapter.
pub fn build_orchestrator(
    reasoning: Arc<dyn ReasoningProvider>,
    payer: Arc<dyn PayerGateway>,
    repository: Arc<dyn CaseRepository>,
    policies: PolicyTable,
    config: OrchestratorConfig,
) -> Result<Orchestrator, EngineError> {
    let workflows = WorkflowRegistry::standard();
    let store = Arc::new(StoreResultAdapter::new());

    let adapters = AdapterRegistry::new()
        .register(
            StepName::ParseInput,
            Arc::new(ParseInputAdapter::new(reasoning.clone())),
        )
        .register(
            StepName::ExtractPatientInfo,
            Arc::new(ExtractPatientInfoAdapter::new(reasoning.clone())),
        )
        .register(
            StepName::ValidateStandardize,
            Arc::new(ValidateStandardizeAdapter::new()),
        )
        .register(
            StepName::SuggestCodes,
            Arc::new(SuggestCodesAdapter::new(reasoning.clone())),
        )
        .register(StepName::StoreEncounter, store.clone())
        .register(
            StepName::CheckEligibility,
            Arc::new(CheckEligibilityAdapter::new(payer.clone())),
        )
        .register(StepName::AssembleClaim, Arc::new(AssembleClaimAdapter::new()))
        .register(
            StepName::SubmitClaim,
            Arc::new(SubmitClaimAdapter::new(payer)),
        )
        .register(StepName::RecordOutcome, store)
        .register(
            StepName::ClassifyDenial,
            Arc::new(ClassifyDenialAdapter::new()),
        )
        .register(
            StepName::AnalyzeDenial,
            Arc::new(AnalyzeDenialAdapter::new(reasoning.clone())),
        )
        .register(
            StepName::DraftAppeal,
            Arc::new(DraftAppealAdapter::new(reasoning)),
        );

    adapters.verify_coverage(&workflows)?;

    let sequencer = StepSequencer::new(workflows, policies);
    Ok(Orchestrator::new(repository, adapters, sequencer).with_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{CaseStatus, ConfidencePolicy};
    use infrastructure::{InMemoryCaseRepository, MockPayerGateway, ScriptedReasoning};
    use serde_json::json;

    fn encounter_script() -> Vec<String> {
        vec![
            r#"{"segments": {"demographics": "John Doe, DOB 1980-01-01, DAMAN policy P-1, MRN-9",
                "complaint": "chest pain", "clinical_notes": "no acute distress, ECG ordered"},
                "confidence": 0.95}"#
                .to_string(),
            r#"{"patient": {"name": "john doe", "date_of_birth": "1980-01-01", "gender": "male",
                 "insurance_provider": "DAMAN", "policy_number": "P-1", "mrn": "MRN-9"},
                "encounter": {"encounter_type": "outpatient", "service_date": "2024-06-01",
                 "chief_complaint": "chest pain"},
                "confidence": 0.95}"#
                .to_string(),
            r#"{"icd10_codes": [{"code": "R07.4", "description": "Chest pain, unspecified",
                 "confidence": 0.95, "rationale": "documented chief complaint"}],
                "cpt_codes": [{"code": "99213", "description": "Office visit, established",
                 "confidence": 0.95, "rationale": "outpatient encounter"}],
                "overall_confidence": 0.95}"#
                .to_string(),
        ]
    }

    #[tokio::test]
    async fn test_end_to_end_encounter_processing() {
        let reasoning = Arc::new(ScriptedReasoning::from_script(encounter_script()));
        let orchestrator = build_orchestrator(
            reasoning,
            Arc::new(MockPayerGateway::new()),
            Arc::new(InMemoryCaseRepository::new()),
            PolicyTable::new(ConfidencePolicy::new(0.9, 0.5, 2).unwrap()),
            OrchestratorConfig::default(),
        )
        .unwrap();

        let state = orchestrator
            .start(
                "encounter-processing",
                json!({"raw_input": "patient John Doe, DOB 1980-01-01, complains of chest pain"}),
            )
            .await
            .unwrap();

        assert_eq!(state.status(), CaseStatus::Completed);
        assert_eq!(state.context().len(), 5);

        // every recorded step belongs to the declared sequence
        let definition = WorkflowRegistry::standard()
            .definition(domain::WorkflowKind::EncounterProcessing)
            .unwrap()
            .steps()
            .to_vec();
        assert!(state.context().iter().all(|e| definition.contains(&e.step)));
    }

    #[tokio::test]
    async fn test_end_to_end_claims_processing() {
        // claims pipeline is gateway/rules only, no reasoning calls needed
        let reasoning = Arc::new(ScriptedReasoning::new());
        let orchestrator = build_orchestrator(
            reasoning,
            Arc::new(MockPayerGateway::new()),
            Arc::new(InMemoryCaseRepository::new()),
            PolicyTable::new(ConfidencePolicy::new(0.9, 0.5, 2).unwrap()),
            OrchestratorConfig::default(),
        )
        .unwrap();

        let state = orchestrator
            .start(
                "claims-processing",
                json!({
                    "payer_id": "DAMAN",
                    "policy_number": "P-1",
                    "service_date": "2024-06-01",
                    "codes": {
                        "icd10_codes": [{"code": "R07.4", "description": "Chest pain",
                            "confidence": 0.95, "rationale": "complaint"}],
                        "cpt_codes": [{"code": "99213", "description": "Office visit",
                            "confidence": 0.95, "rationale": "visit"}]
                    }
                }),
            )
            .await
            .unwrap();

        assert_eq!(state.status(), CaseStatus::Completed);
        assert_eq!(state.context().len(), 4);

        let submitted = state
            .accepted_outputs()
            .get("submit-claim")
            .cloned()
            .unwrap();
        assert_eq!(submitted["accepted"], json!(true));
    }

    #[tokio::test]
    async fn test_end_to_end_denial_handling() {
        let reasoning = Arc::new(ScriptedReasoning::from_script(vec![
            r#"{"root_cause": "Prior authorization was never requested",
                "recommended_action": "Request retro-authorization and resubmit",
                "appeal_viability": 0.95, "confidence": 0.95}"#
                .to_string(),
            r#"{"letter": "To the appeals department: we contest denial code 197 for claim CLM12345678 ...",
                "attachments": ["clinical notes", "authorization request"],
                "confidence": 0.95}"#
                .to_string(),
        ]));
        let orchestrator = build_orchestrator(
            reasoning,
            Arc::new(MockPayerGateway::new()),
            Arc::new(InMemoryCaseRepository::new()),
            PolicyTable::new(ConfidencePolicy::new(0.9, 0.5, 2).unwrap()),
            OrchestratorConfig::default(),
        )
        .unwrap();

        let state = orchestrator
            .start(
                "denial-handling",
                json!({
                    "denial_code": "197",
                    "denial_reason": "Precertification absent",
                    "claim_number": "CLM12345678",
                }),
            )
            .await
            .unwrap();

        assert_eq!(state.status(), CaseStatus::Completed);
        assert_eq!(state.context().len(), 4);
    }
}
