//! seatcast - Main Entry Point

use clap::Parser;
use seatcast::cli::{cmd_analyze, cmd_history, cmd_inspect, AnalyzeArgs, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatcast=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { data, name, source, seed, config, history, json } => {
            cmd_analyze(AnalyzeArgs {
                data: &data,
                name: name.as_deref(),
                source: &source,
                seed,
                config: config.as_deref(),
                history: history.as_deref(),
                json,
            })?;
        }
        Commands::Inspect { data } => {
            cmd_inspect(&data)?;
        }
        Commands::History { history, limit } => {
            cmd_history(&history, limit)?;
        }
    }

    Ok(())
}
