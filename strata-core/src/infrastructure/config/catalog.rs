// strata-core/src/infrastructure/config/catalog.rs

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::domain::quality::{CheckDeclaration, QualityCatalog};
use crate::error::StrataError;
use crate::infrastructure::config::project::load_fragment;
use crate::infrastructure::error::InfrastructureError;

#[derive(Deserialize)]
struct CatalogFile {
    checks: Vec<CheckDeclaration>,
}

/// Reads `quality.yml` and compiles every declared check.
pub fn load_catalog(path: &Path) -> Result<QualityCatalog, StrataError> {
    if !path.exists() {
        return Err(InfrastructureError::ConfigNotFound(path.display().to_string()).into());
    }
    let file: CatalogFile = load_fragment(path)?;
    let catalog = QualityCatalog::compile(file.checks)?;
    info!(path = ?path, checks = catalog.len(), "Quality catalog loaded");
    Ok(catalog)
}
