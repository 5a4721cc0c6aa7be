// strata/src/commands/checks.rs
//
// USE CASE: Preview the quality catalog without touching the warehouse.

use std::path::PathBuf;

use anyhow::Context;
use strata_core::application::ports::TemplateEngine;
use strata_core::infrastructure::compiler::jinja::JinjaRenderer;
use strata_core::infrastructure::config::{load_catalog, load_project_config};

pub fn execute(project_dir: PathBuf, sql: bool) -> anyhow::Result<()> {
    let config = load_project_config(&project_dir)?;
    let catalog_path = config.catalog_path();
    let catalog = load_catalog(&catalog_path)
        .with_context(|| format!("Failed to load quality catalog {}", catalog_path.display()))?;

    let binding = config.curated_binding();
    println!(
        "📋 {} checks in {} (bound to {}.{})",
        catalog.len(),
        catalog_path.display(),
        binding.project,
        binding.dataset
    );

    let renderer = JinjaRenderer::new();
    let context = renderer.context(&binding);
    for check in catalog.checks() {
        println!("   [{:<8}] {}", check.severity().as_str(), check.name());
        if !check.description().is_empty() {
            println!("              {}", check.description());
        }
        if sql {
            let rendered = renderer
                .render(check.query_template(), &context)
                .with_context(|| format!("Failed to render check '{}'", check.name()))?;
            println!("\n{}\n", rendered);
        }
    }

    Ok(())
}
