//! Confidence evaluator
//!
//! Collapses the heterogeneous signals tools report (model-claimed
//! probability, rule-match completeness, cross-field consistency) into the
//! single [0, 1] score the sequencer gates on. Pure and deterministic:
//! identical inputs always produce identical scores, so every gate decision
//! is reproducible from the audit log.

use serde_json::Value;

use crate::domain::tool::{ConfidenceSignals, ToolResponse, ValidationIssue};
use crate::domain::workflow::StepName;

/// Ephemeral, scored result of one step attempt.
///
/// Owned by the sequencer during one transition; only its digest (payload,
/// score, disposition) is folded into the case's context log.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step: StepName,
    pub payload: Value,
    pub confidence: f64,
    pub issues: Vec<ValidationIssue>,
    pub provenance: Provenance,
}

/// Where a step result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Produced by the registered tool adapter
    Tool,
    /// Synthesized after the tool was unavailable (timeout or outage)
    Unavailable,
    /// Folded from a human reviewer's decision
    Human,
}

impl StepResult {
    /// Result standing in for an unavailable tool: zero confidence, blocking
    /// issue carrying the outage detail.
    pub fn unavailable(step: StepName, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            step,
            payload: Value::Null,
            confidence: 0.0,
            issues: vec![ValidationIssue::blocking("tool", detail)],
            provenance: Provenance::Unavailable,
        }
    }

    /// Result folded from a human decision; human override is authoritative.
    pub fn human(step: StepName, payload: Value) -> Self {
        Self {
            step,
            payload,
            confidence: 1.0,
            issues: Vec::new(),
            provenance: Provenance::Human,
        }
    }

    pub fn has_blocking_issues(&self) -> bool {
        self.issues.iter().any(|i| i.blocking)
    }
}

/// Per-step signal weights: (model, rule_match, consistency)
fn weights(step: StepName) -> (f64, f64, f64) {
    match step {
        // Rule-driven steps: the deterministic checks carry the score
        StepName::ValidateStandardize
        | StepName::AssembleClaim
        | StepName::ClassifyDenial
        | StepName::StoreEncounter
        | StepName::RecordOutcome => (0.2, 0.6, 0.2),

        // Lookup-driven steps: consistency of the returned coverage matters
        StepName::CheckEligibility | StepName::SubmitClaim => (0.3, 0.3, 0.4),

        // Reasoning-driven steps: the model's own estimate dominates
        StepName::ParseInput
        | StepName::ExtractPatientInfo
        | StepName::SuggestCodes
        | StepName::AnalyzeDenial
        | StepName::DraftAppeal => (0.5, 0.3, 0.2),
    }
}

/// Pure scoring function over raw tool signals
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceEvaluator;

impl ConfidenceEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Normalize raw signals into a single [0, 1] score.
    ///
    /// Weighted mean over the signals that are present, renormalized so a
    /// tool reporting only one signal is not penalized for the absent ones.
    /// No signals at all scores 0.0.
    pub fn score(&self, step: StepName, signals: &ConfidenceSignals) -> f64 {
        let (w_model, w_rules, w_consistency) = weights(step);

        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        if let Some(model) = signals.model {
            weighted += w_model * model;
            total_weight += w_model;
        }
        if let Some(rule_match) = signals.rule_match {
            weighted += w_rules * rule_match;
            total_weight += w_rules;
        }
        if let Some(consistency) = signals.consistency {
            weighted += w_consistency * consistency;
            total_weight += w_consistency;
        }

        if total_weight == 0.0 {
            return 0.0;
        }

        (weighted / total_weight).clamp(0.0, 1.0)
    }

    /// Score a tool response, selecting among candidates when the step
    /// produced several alternatives.
    ///
    /// Selection: highest-scoring candidate wins; ties are broken by the
    /// tool-declared preference rank (lower wins), never by iteration order.
    pub fn resolve(&self, step: StepName, response: ToolResponse) -> StepResult {
        let ToolResponse {
            payload,
            signals,
            issues,
            candidates,
        } = response;

        let (payload, confidence) = if candidates.is_empty() {
            (payload, self.score(step, &signals))
        } else {
            let mut best: Option<(Value, f64, u32)> = None;
            for candidate in candidates {
                let score = self.score(step, &candidate.signals);
                let better = match &best {
                    None => true,
                    Some((_, best_score, best_pref)) => {
                        score > *best_score
                            || (score == *best_score && candidate.preference < *best_pref)
                    }
                };
                if better {
                    best = Some((candidate.payload, score, candidate.preference));
                }
            }
            let (payload, score, _) = best.expect("non-empty candidate list");
            (payload, score)
        };

        StepResult {
            step,
            payload,
            confidence,
            issues,
            provenance: Provenance::Tool,
        }
    }
}
