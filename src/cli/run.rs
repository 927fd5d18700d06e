//! `run` subcommand
//!
//! Starts a case and drives it until completion. When the engine suspends
//! for human review the question and proposed payload are printed and the
//! decision is read from stdin, mirroring how a reviewer would answer
//! through any other transport.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde_json::Value;

use crate::build_orchestrator;
use crate::config::AppConfig;
use crate::domain::{CaseStatus, ReasoningProvider};
use crate::infrastructure::{
    HttpReasoningProvider, InMemoryCaseRepository, MockPayerGateway, ScriptedReasoning,
};
use crate::orchestrator::HumanDecision;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Workflow kind (encounter-processing, claims-processing, denial-handling)
    #[arg(long)]
    pub workflow: String,

    /// Path to a JSON file with the initial case input
    #[arg(long)]
    pub input: PathBuf,

    /// Use canned demo completions instead of a live reasoning endpoint
    #[arg(long)]
    pub offline: bool,
}

pub async fn run(args: RunArgs, config: AppConfig) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading input file {}", args.input.display()))?;
    let input: Value = serde_json::from_str(&raw).context("input file is not valid JSON")?;

    let reasoning: Arc<dyn ReasoningProvider> = if args.offline {
        Arc::new(ScriptedReasoning::from_script(demo_script(&args.workflow)))
    } else {
        let api_key = std::env::var(&config.reasoning.api_key_env).with_context(|| {
            format!(
                "reasoning API key environment variable {} is not set",
                config.reasoning.api_key_env
            )
        })?;
        Arc::new(
            HttpReasoningProvider::new(
                &config.reasoning.base_url,
                api_key,
                config.reasoning.timeout_ms,
            )?
            .with_model(&config.reasoning.model),
        )
    };

    let orchestrator = build_orchestrator(
        reasoning,
        Arc::new(MockPayerGateway::new()),
        Arc::new(InMemoryCaseRepository::new()),
        config.policy.to_table(),
        config.engine.to_orchestrator_config(),
    )?;

    let mut state = orchestrator.start(&args.workflow, input).await?;

    while state.status() == CaseStatus::AwaitingHumanReview {
        let Some(review) = state.pending_review() else {
            break;
        };

        println!("\n--- human review requested ---");
        println!("{}", review.question);
        if !review.fields.is_empty() {
            println!("fields: {}", review.fields.join(", "));
        }
        println!(
            "proposed:\n{}",
            serde_json::to_string_pretty(&review.proposed)?
        );
        print!("approve | reject <reason> > ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let decision = parse_decision(line.trim());

        state = orchestrator.resume(state.id(), decision).await?;
    }

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn parse_decision(line: &str) -> HumanDecision {
    match line.split_once(' ') {
        Some(("reject", reason)) => HumanDecision::Reject {
            reason: reason.trim().to_string(),
        },
        _ if line == "reject" => HumanDecision::Reject {
            reason: "rejected by reviewer".to_string(),
        },
        _ => HumanDecision::Approve {
            payload: None,
            note: None,
        },
    }
}

/// Canned completions for `--offline` runs; enough to push the demo case
/// through every reasoning-backed step of the chosen workflow.
fn demo_script(workflow: &str) -> Vec<String> {
    match workflow {
        "encounter-processing" => vec![
            r#"{"segments": {"demographics": "John Doe, DOB 1980-01-01, DAMAN policy P-100, MRN-204",
                "complaint": "chest pain for two days", "clinical_notes": "BP 128/82, ECG ordered, no acute distress"},
                "confidence": 0.94}"#
                .to_string(),
            r#"{"patient": {"name": "john doe", "date_of_birth": "1980-01-01", "gender": "male",
                 "insurance_provider": "DAMAN", "policy_number": "P-100", "mrn": "MRN-204"},
                "encounter": {"encounter_type": "outpatient", "service_date": "2024-06-01",
                 "chief_complaint": "chest pain"},
                "confidence": 0.93}"#
                .to_string(),
            r#"{"icd10_codes": [{"code": "R07.4", "description": "Chest pain, unspecified",
                 "confidence": 0.95, "rationale": "documented chief complaint"}],
                "cpt_codes": [{"code": "99213", "description": "Office visit, established patient",
                 "confidence": 0.93, "rationale": "outpatient evaluation"},
                 {"code": "93000", "description": "Electrocardiogram, complete",
                 "confidence": 0.92, "rationale": "ECG ordered during visit"}],
                "overall_confidence": 0.93}"#
                .to_string(),
        ],
        "denial-handling" => vec![
            r#"{"root_cause": "The ECG required prior authorization under the member's plan and none was requested",
                "recommended_action": "Request retro-authorization with the clinical notes attached and resubmit",
                "appeal_viability": 0.9, "confidence": 0.92}"#
                .to_string(),
            r#"{"letter": "To the appeals department: we respectfully contest the denial of claim referenced above. The service was medically necessary as documented in the attached clinical notes, and a retro-authorization request accompanies this appeal.",
                "attachments": ["clinical notes", "retro-authorization request", "original claim"],
                "confidence": 0.91}"#
                .to_string(),
        ],
        // claims-processing needs no reasoning calls
        _ => Vec::new(),
    }
}
