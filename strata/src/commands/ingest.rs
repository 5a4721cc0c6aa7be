// strata/src/commands/ingest.rs
//
// USE CASE: Load every declared source file into the raw layer.

use std::path::PathBuf;

use anyhow::Context;
use strata_core::application::{IngestionOrchestrator, run_schema_script};
use strata_core::infrastructure::adapters::DuckDbWarehouse;
use strata_core::infrastructure::config::load_project_config;
use strata_core::infrastructure::ledger::CsvLedger;
use tracing::debug;

pub async fn execute(
    project_dir: PathBuf,
    skip_schema: bool,
    fail_on_error: bool,
) -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    // A. Load the Config (Infra)
    println!("⚙️  Loading configuration...");
    let config = load_project_config(&project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;
    let units = config
        .ingestion_units()
        .context("Invalid ingestion unit declaration")?;
    println!(
        "   Project: {} ({} units -> {})",
        config.name,
        units.len(),
        config.raw_binding().dataset
    );

    // B. Instantiate the adapters
    let db_path = config.warehouse_path();
    if db_path != ":memory:" {
        if let Some(parent) = PathBuf::from(&db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!(db = %db_path, timeout = ?config.timeout(), "Opening warehouse");
    let warehouse = DuckDbWarehouse::new(&db_path, config.timeout())
        .with_context(|| format!("Failed to initialize DuckDB at {}", db_path))?;
    let ledger = CsvLedger::new(config.ledger_path());
    println!("   Ledger: {}", ledger.path().display());

    // C. Schema precondition: aborts the run before any unit
    let schema_script = config.schema_script_path().filter(|_| !skip_schema);
    if let Some(script) = schema_script {
        println!("🏗️  Running schema script {}...", script.display());
        if let Err(e) = run_schema_script(&warehouse, &ledger, &script).await {
            eprintln!("\n💥 PRECONDITION FAILED: {}", e);
            std::process::exit(1);
        }
    }

    // D. Run the units (Application Layer)
    let orchestrator = IngestionOrchestrator::new(&warehouse, &ledger)
        .with_disposition(config.ingestion.write_disposition);
    let report = orchestrator
        .run(&units)
        .await
        .context("Ledger could not be written")?;

    for outcome in &report.outcomes {
        match &outcome.error {
            None => println!(
                "   ✅ {:<22} {} ({} rows)",
                outcome.operation, outcome.destination, outcome.rows_written
            ),
            Some(cause) => println!(
                "   ❌ {:<22} {}: {}",
                outcome.operation, outcome.destination, cause
            ),
        }
    }

    if report.has_errors() {
        eprintln!(
            "\n⚠️  {} of {} units failed. See {} for details.",
            report.failed(),
            report.outcomes.len(),
            ledger.path().display()
        );
        if fail_on_error {
            eprintln!("💥 --fail-on-error: Failing due to unit errors.");
            std::process::exit(1);
        }
    } else {
        println!(
            "\n✨ SUCCESS! {} rows loaded in {:.2?}",
            report.rows_written(),
            start.elapsed()
        );
    }

    Ok(())
}
