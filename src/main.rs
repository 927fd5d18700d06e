use clap::Parser;
use rcm_engine::cli::{self, Cli, Command};
use rcm_engine::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    cli::init_tracing(&config.logging);

    match cli.command {
        Command::Run(args) => cli::run::run(args, config).await,
        Command::Kinds => {
            cli::kinds::run();
            Ok(())
        }
    }
}
