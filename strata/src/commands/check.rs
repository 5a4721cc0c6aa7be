// strata/src/commands/check.rs
//
// USE CASE: Quality gate over the curated layer.

use std::path::PathBuf;

use anyhow::Context;
use strata_core::application::QualityRunner;
use strata_core::application::report::{render_table, summary_line, to_json};
use strata_core::infrastructure::adapters::DuckDbWarehouse;
use strata_core::infrastructure::compiler::jinja::JinjaRenderer;
use strata_core::infrastructure::config::{load_catalog, load_project_config};
use strata_core::infrastructure::fs::atomic_write;
use tracing::debug;

use crate::cli::ReportFormat;

pub async fn execute(
    project_dir: PathBuf,
    project: Option<String>,
    dataset: Option<String>,
    output_json: Option<PathBuf>,
    format: ReportFormat,
) -> anyhow::Result<()> {
    let mut config = load_project_config(&project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;

    // CLI flags win over file and environment
    if let Some(project) = project {
        config.warehouse.project = project;
    }
    if let Some(dataset) = dataset {
        config.quality.dataset = dataset;
    }
    let binding = config.curated_binding();

    let catalog_path = config.catalog_path();
    let catalog = load_catalog(&catalog_path)
        .with_context(|| format!("Failed to load quality catalog {}", catalog_path.display()))?;

    let db_path = config.warehouse_path();
    debug!(db = %db_path, binding = ?binding, "Opening warehouse");
    let warehouse = DuckDbWarehouse::new(&db_path, config.timeout())
        .with_context(|| format!("Failed to initialize DuckDB at {}", db_path))?;
    let renderer = JinjaRenderer::new();

    if format == ReportFormat::Table {
        println!(
            "🛡️  Running {} checks against {}.{}...",
            catalog.len(),
            binding.project,
            binding.dataset
        );
    }

    let report = QualityRunner::new(&warehouse, &renderer)
        .run(&catalog, &binding)
        .await;

    let json = to_json(&report.results)?;
    if let Some(path) = &output_json {
        atomic_write(path, &json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    match format {
        ReportFormat::Json => println!("{}", json),
        ReportFormat::Table => {
            println!("{}", render_table(&report.results));
            println!("📊 {}", summary_line(&report.results));
            if let Some(path) = &output_json {
                println!("📄 JSON report saved to {}", path.display());
            }
        }
    }

    if report.has_failures() {
        eprintln!("\n❌ Quality gate failed.");
        std::process::exit(1);
    }

    if format == ReportFormat::Table {
        println!("\n✨ All checks passed.");
    }
    Ok(())
}
