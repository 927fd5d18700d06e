//! Workflow definitions
//!
//! Each workflow kind is an ordered, acyclic progression of named steps. The
//! step set is closed: the sequencer only ever sees names from this enum, and
//! the adapter registry is keyed by them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::case::WorkflowKind;
use crate::domain::error::EngineError;

/// Closed set of step names across all workflow kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepName {
    // encounter-processing
    ParseInput,
    ExtractPatientInfo,
    ValidateStandardize,
    SuggestCodes,
    StoreEncounter,

    // claims-processing
    CheckEligibility,
    AssembleClaim,
    SubmitClaim,
    RecordOutcome,

    // denial-handling
    ClassifyDenial,
    AnalyzeDenial,
    DraftAppeal,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseInput => "parse-input",
            Self::ExtractPatientInfo => "extract-patient-info",
            Self::ValidateStandardize => "validate-standardize",
            Self::SuggestCodes => "suggest-codes",
            Self::StoreEncounter => "store-encounter",
            Self::CheckEligibility => "check-eligibility",
            Self::AssembleClaim => "assemble-claim",
            Self::SubmitClaim => "submit-claim",
            Self::RecordOutcome => "record-outcome",
            Self::ClassifyDenial => "classify-denial",
            Self::AnalyzeDenial => "analyze-denial",
            Self::DraftAppeal => "draft-appeal",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered step sequence for one workflow kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    kind: WorkflowKind,
    steps: Vec<StepName>,
}

impl WorkflowDefinition {
    /// Create a definition; the step list must be non-empty and free of
    /// duplicates (the progression is acyclic by construction).
    pub fn new(kind: WorkflowKind, steps: Vec<StepName>) -> Result<Self, EngineError> {
        if steps.is_empty() {
            return Err(EngineError::configuration(format!(
                "workflow '{}' has no steps",
                kind
            )));
        }

        for (i, step) in steps.iter().enumerate() {
            if steps[..i].contains(step) {
                return Err(EngineError::configuration(format!(
                    "workflow '{}' repeats step '{}'",
                    kind, step
                )));
            }
        }

        Ok(Self { kind, steps })
    }

    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    pub fn steps(&self) -> &[StepName] {
        &self.steps
    }

    pub fn first_step(&self) -> StepName {
        self.steps[0]
    }

    pub fn contains(&self, step: StepName) -> bool {
        self.steps.contains(&step)
    }

    /// The step after `step`, or None if `step` is the last one
    pub fn next_after(&self, step: StepName) -> Result<Option<StepName>, EngineError> {
        let index = self
            .steps
            .iter()
            .position(|s| *s == step)
            .ok_or_else(|| {
                EngineError::internal(format!(
                    "step '{}' is not part of workflow '{}'",
                    step, self.kind
                ))
            })?;
        Ok(self.steps.get(index + 1).copied())
    }
}

/// Registry of the workflow definitions known to the engine, built once at
/// startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct WorkflowRegistry {
    definitions: HashMap<WorkflowKind, WorkflowDefinition>,
}

impl WorkflowRegistry {
    /// The built-in pipelines: encounter intake, claim submission, and
    /// denial handling.
    pub fn standard() -> Self {
        use StepName::*;

        let definitions = [
            WorkflowDefinition::new(
                WorkflowKind::EncounterProcessing,
                vec![
                    ParseInput,
                    ExtractPatientInfo,
                    ValidateStandardize,
                    SuggestCodes,
                    StoreEncounter,
                ],
            ),
            WorkflowDefinition::new(
                WorkflowKind::ClaimsProcessing,
                vec![CheckEligibility, AssembleClaim, SubmitClaim, RecordOutcome],
            ),
            WorkflowDefinition::new(
                WorkflowKind::DenialHandling,
                vec![ClassifyDenial, AnalyzeDenial, DraftAppeal, RecordOutcome],
            ),
        ];

        let definitions = definitions
            .into_iter()
            .map(|d| d.expect("built-in workflow definitions are valid"))
            .map(|d| (d.kind(), d))
            .collect();

        Self { definitions }
    }

    /// Build a registry from explicit definitions
    pub fn from_definitions(
        definitions: Vec<WorkflowDefinition>,
    ) -> Result<Self, EngineError> {
        let mut map = HashMap::new();
        for definition in definitions {
            if map.insert(definition.kind(), definition).is_some() {
                return Err(EngineError::configuration(
                    "duplicate workflow definition for the same kind",
                ));
            }
        }
        if map.is_empty() {
            return Err(EngineError::configuration("no workflow definitions"));
        }
        Ok(Self { definitions: map })
    }

    pub fn definition(&self, kind: WorkflowKind) -> Result<&WorkflowDefinition, EngineError> {
        self.definitions
            .get(&kind)
            .ok_or_else(|| EngineError::invalid_workflow_kind(kind.as_str()))
    }

    pub fn kinds(&self) -> Vec<WorkflowKind> {
        let mut kinds: Vec<_> = self.definitions.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}
