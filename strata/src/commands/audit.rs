// strata/src/commands/audit.rs
//
// USE CASE: Post-hoc reading of the ingestion ledger.

use std::path::PathBuf;

use strata_core::application::{incomplete_units, summarize};
use strata_core::infrastructure::config::load_project_config;
use strata_core::infrastructure::ledger::CsvLedger;
use strata_core::ports::Ledger;

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    let config = load_project_config(&project_dir)?;
    let ledger = CsvLedger::new(config.ledger_path());

    if !ledger.path().exists() {
        println!("📭 No ledger at {} (nothing ingested yet).", ledger.path().display());
        return Ok(());
    }

    let entries = ledger.entries()?;
    println!(
        "🔎 {} entries in {}",
        entries.len(),
        ledger.path().display()
    );

    for (table_id, tally) in summarize(&entries) {
        let marker = if tally.failed > 0 { "❌" } else { "✅" };
        println!(
            "   {} {:<45} {} ok / {} failed",
            marker, table_id, tally.succeeded, tally.failed
        );
    }

    let incomplete = incomplete_units(&entries);
    if incomplete.is_empty() {
        println!("   ✅ Every started unit reached a terminal entry.");
    } else {
        eprintln!("\n⚠️  {} unit(s) never finished:", incomplete.len());
        for unit in &incomplete {
            eprintln!(
                "   ⏳ {} {} (started {})",
                unit.operation,
                unit.table_id,
                unit.started.timestamp.to_rfc3339()
            );
        }
    }

    Ok(())
}
