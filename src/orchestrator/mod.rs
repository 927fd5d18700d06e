//! Orchestrator
//!
//! The sole entry point external callers use. Loads or creates a case,
//! drives the step sequencer until the case is terminal or suspended for
//! human review, and persists the state after every transition — the audit
//! log is never ahead of what is durably stored.
//!
//! Execution is logically single-threaded per case: an async mutex per case
//! id serializes all operations touching the same case, while distinct cases
//! run fully in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::{
    AdapterRegistry, CaseId, CaseRepository, CaseState, CaseStatus, ConfidenceEvaluator,
    EngineError, StepInput, StepName, StepResult, StepSequencer, ToolError, WorkflowKind,
};

/// A human reviewer's answer to a pending review
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum HumanDecision {
    /// Confirm the proposed output, optionally correcting it
    Approve {
        /// Corrected payload; when absent the proposed payload stands
        #[serde(default)]
        payload: Option<Value>,

        /// Optional reviewer note
        #[serde(default)]
        note: Option<String>,
    },

    /// Reject the output and terminate the case
    Reject { reason: String },
}

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Default per-step tool timeout in milliseconds
    pub default_timeout_ms: u64,

    /// Per-step timeout overrides
    pub step_timeouts_ms: HashMap<StepName, u64>,

    /// Upper bound on transitions per drive (guards against definition bugs)
    pub max_transitions: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 60_000,
            step_timeouts_ms: HashMap::new(),
            max_transitions: 100,
        }
    }
}

impl OrchestratorConfig {
    fn timeout_for(&self, step: StepName) -> u64 {
        self.step_timeouts_ms
            .get(&step)
            .copied()
            .unwrap_or(self.default_timeout_ms)
    }
}

/// The workflow orchestrator
#[derive(Debug)]
pub struct Orchestrator {
    repository: Arc<dyn CaseRepository>,
    adapters: AdapterRegistry,
    sequencer: StepSequencer,
    evaluator: ConfidenceEvaluator,
    config: OrchestratorConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        repository: Arc<dyn CaseRepository>,
        adapters: AdapterRegistry,
        sequencer: StepSequencer,
    ) -> Self {
        Self {
            repository,
            adapters,
            sequencer,
            evaluator: ConfidenceEvaluator::new(),
            config: OrchestratorConfig::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Start a new case in the named workflow and run it until terminal or
    /// suspended. Fails with `InvalidWorkflowKind` before any state exists.
    pub async fn start(&self, kind: &str, initial_input: Value) -> Result<CaseState, EngineError> {
        let kind: WorkflowKind = kind.parse()?;
        let definition = self.sequencer.workflows().definition(kind)?;

        let id = CaseId::generate();
        let mut state = CaseState::new(id.clone(), kind, definition.first_step(), initial_input);

        info!(case = %id, workflow = %kind, "starting case");

        let lock = self.case_lock(&id).await;
        let _guard = lock.lock().await;

        self.persist(&mut state).await?;
        self.drive(&mut state).await?;
        Ok(state)
    }

    /// Resume a case that is awaiting human review by folding the reviewer's
    /// decision, then continue running. Fails with `InvalidStateTransition`
    /// (leaving stored state untouched) if the case is not awaiting review.
    pub async fn resume(
        &self,
        case_id: &CaseId,
        decision: HumanDecision,
    ) -> Result<CaseState, EngineError> {
        let lock = self.case_lock(case_id).await;
        let _guard = lock.lock().await;

        let mut state = self.load(case_id).await?;

        if state.status() != CaseStatus::AwaitingHumanReview {
            return Err(EngineError::invalid_state_transition(format!(
                "case '{}' is {}, not awaiting-human-review",
                case_id,
                state.status()
            )));
        }

        let review = state
            .pending_review()
            .cloned()
            .ok_or_else(|| EngineError::internal("awaiting-human-review without pending review"))?;

        match decision {
            HumanDecision::Reject { reason } => {
                info!(case = %case_id, "reviewer rejected pending output");
                self.sequencer.apply_rejection(&mut state, reason)?;
                self.persist(&mut state).await?;
                return Ok(state);
            }
            HumanDecision::Approve { payload, note } => {
                let confirmed = payload.unwrap_or(review.proposed);
                let result = StepResult::human(review.step, confirmed);
                let snapshot = json!({
                    "human_decision": "approve",
                    "note": note,
                    "reviewed_step": review.step,
                });

                // Human override is authoritative: confidence 1.0 clears any
                // valid auto-approve threshold, so the sequencer advances.
                let transition = self.sequencer.decide(&state, &result)?;
                self.sequencer.apply(&mut state, snapshot, result, transition)?;
                self.persist(&mut state).await?;
            }
        }

        self.drive(&mut state).await?;
        Ok(state)
    }

    /// Read-only snapshot of a case
    pub async fn get_state(&self, case_id: &CaseId) -> Result<CaseState, EngineError> {
        self.load(case_id).await
    }

    async fn load(&self, case_id: &CaseId) -> Result<CaseState, EngineError> {
        self.repository
            .load(case_id)
            .await?
            .ok_or_else(|| EngineError::case_not_found(case_id.as_str()))
    }

    /// Run the sequencer loop until the case leaves in-progress
    async fn drive(&self, state: &mut CaseState) -> Result<(), EngineError> {
        let mut transitions = 0usize;

        while state.status() == CaseStatus::InProgress {
            if transitions >= self.config.max_transitions {
                return Err(EngineError::internal(format!(
                    "case '{}' exceeded {} transitions without settling",
                    state.id(),
                    self.config.max_transitions
                )));
            }
            transitions += 1;

            let step = state.current_step();
            let adapter = self.adapters.get(step)?;
            let attempt = state.next_attempt();

            let input = StepInput {
                case: state.id().clone(),
                kind: state.kind(),
                step,
                attempt,
                input: state.input().clone(),
                prior: state.accepted_outputs(),
            };
            let snapshot = serde_json::to_value(&input)
                .map_err(|e| EngineError::internal(format!("input snapshot: {e}")))?;

            debug!(case = %state.id(), %step, attempt, tool = adapter.name(), "executing step");

            let timeout_ms = self.config.timeout_for(step);
            let result = match timeout(Duration::from_millis(timeout_ms), adapter.execute(input))
                .await
            {
                Ok(Ok(response)) => self.evaluator.resolve(step, response),
                Ok(Err(ToolError::Unavailable(detail))) => {
                    warn!(case = %state.id(), %step, %detail, "tool unavailable");
                    StepResult::unavailable(step, detail)
                }
                Err(_) => {
                    warn!(case = %state.id(), %step, timeout_ms, "tool timed out");
                    StepResult::unavailable(
                        step,
                        format!("'{}' timed out after {}ms", adapter.name(), timeout_ms),
                    )
                }
            };

            debug!(
                case = %state.id(),
                %step,
                confidence = result.confidence,
                "scored step result"
            );

            let transition = self.sequencer.decide(state, &result)?;
            self.sequencer.apply(state, snapshot, result, transition)?;
            self.persist(state).await?;
        }

        info!(case = %state.id(), status = %state.status(), "case settled");
        Ok(())
    }

    async fn persist(&self, state: &mut CaseState) -> Result<(), EngineError> {
        state.bump_version();
        self.repository.save(state).await
    }

    async fn case_lock(&self, case_id: &CaseId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(case_id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
