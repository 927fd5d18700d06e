//! CLI module for the RCM engine
//!
//! Subcommands:
//! - `run`: start a case in a workflow and drive it to completion,
//!   answering review questions interactively on stdin
//! - `kinds`: list the workflow kinds and their step sequences

pub mod kinds;
pub mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// RCM Engine - AI workflow orchestration for revenue cycle management
#[derive(Parser)]
#[command(name = "rcm-engine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a case through a workflow
    Run(run::RunArgs),

    /// List workflow kinds and their steps
    Kinds,
}

/// Install the global tracing subscriber per the logging config
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        }
    }
}
