// strata/src/main.rs

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug strata ingest ... to see engine calls
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest {
            project_dir,
            skip_schema,
            fail_on_error,
        } => commands::ingest::execute(project_dir, skip_schema, fail_on_error).await,

        Commands::Check {
            project_dir,
            project,
            dataset,
            output_json,
            format,
        } => {
            commands::check::execute(project_dir, project, dataset, output_json, format).await
        }

        Commands::Checks { project_dir, sql } => commands::checks::execute(project_dir, sql),

        Commands::Audit { project_dir } => commands::audit::execute(project_dir),
    }
}
