//! Wine quality pipeline - main entry point

use clap::Parser;
use wine_quality_pipeline::cli::{
    cmd_evaluate, cmd_preprocess, cmd_results, cmd_run, cmd_runs, cmd_serve, cmd_train, Cli,
    Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wine_quality_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess { config } => cmd_preprocess(&config)?,
        Commands::Train { config } => cmd_train(&config)?,
        Commands::Evaluate { config } => cmd_evaluate(&config)?,
        Commands::Serve { config, port, host } => cmd_serve(&config, host, port).await?,
        Commands::Run { config } => cmd_run(&config)?,
        Commands::Results { config } => cmd_results(&config)?,
        Commands::Runs { config, limit } => cmd_runs(&config, limit)?,
    }

    Ok(())
}
