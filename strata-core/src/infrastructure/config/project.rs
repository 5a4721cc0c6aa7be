// strata-core/src/infrastructure/config/project.rs

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use validator::Validate;

use crate::domain::error::DomainError;
use crate::domain::ingestion::IngestionUnit;
use crate::domain::table::TableBinding;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::normalizers::Normalizer;
use crate::ports::warehouse::WriteDisposition;

const CONFIG_CANDIDATES: [&str; 2] = ["strata.yaml", "strata_project.yaml"];

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ProjectConfig {
    #[validate(length(min = 1, message = "project name cannot be empty"))]
    pub name: String,

    #[serde(default)]
    #[validate(nested)]
    pub warehouse: WarehouseConfig,

    #[serde(default)]
    #[validate(nested)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    #[validate(nested)]
    pub quality: QualityConfig,

    /// Directory the file was loaded from; relative paths resolve against it.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct WarehouseConfig {
    #[serde(default = "default_warehouse_path")]
    pub path: String,
    #[serde(default = "default_project")]
    #[validate(length(min = 1))]
    pub project: String,
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, max = 86400, message = "timeout must be between 1s and 24h"))]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct IngestionConfig {
    #[serde(default = "default_raw_dataset")]
    #[validate(length(min = 1))]
    pub dataset: String,
    #[serde(default = "default_ledger")]
    pub ledger: String,
    #[serde(default)]
    pub schema_script: Option<String>,
    #[serde(default)]
    pub write_disposition: WriteDisposition,
    #[serde(default)]
    #[validate(nested)]
    pub units: Vec<UnitConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct UnitConfig {
    #[serde(default)]
    pub operation: Option<String>,
    #[validate(length(min = 1, message = "unit source cannot be empty"))]
    pub source: String,
    #[validate(length(min = 1, message = "unit destination cannot be empty"))]
    pub destination: String,
    pub normalizer: Normalizer,
    /// Explicit tables for fan-out sets: `{set: table}`.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct QualityConfig {
    #[serde(default = "default_curated_dataset")]
    #[validate(length(min = 1))]
    pub dataset: String,
    #[serde(default = "default_catalog")]
    pub catalog: String,
}

fn default_warehouse_path() -> String {
    "warehouse.duckdb".to_string()
}
fn default_project() -> String {
    "local".to_string()
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_raw_dataset() -> String {
    "raw".to_string()
}
fn default_ledger() -> String {
    "logs/pipeline_ingestion.csv".to_string()
}
fn default_curated_dataset() -> String {
    "curated".to_string()
}
fn default_catalog() -> String {
    "config/quality.yml".to_string()
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: default_warehouse_path(),
            project: default_project(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            dataset: default_raw_dataset(),
            ledger: default_ledger(),
            schema_script: None,
            write_disposition: WriteDisposition::default(),
            units: Vec::new(),
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            dataset: default_curated_dataset(),
            catalog: default_catalog(),
        }
    }
}

impl ProjectConfig {
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// DuckDB target; `:memory:` is passed through untouched.
    pub fn warehouse_path(&self) -> String {
        if self.warehouse.path == ":memory:" {
            self.warehouse.path.clone()
        } else {
            self.resolve(&self.warehouse.path).display().to_string()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.warehouse.timeout_secs)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.resolve(&self.ingestion.ledger)
    }

    pub fn schema_script_path(&self) -> Option<PathBuf> {
        self.ingestion.schema_script.as_deref().map(|s| self.resolve(s))
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.quality.catalog)
    }

    pub fn raw_binding(&self) -> TableBinding {
        TableBinding::new(&self.warehouse.project, &self.ingestion.dataset)
    }

    pub fn curated_binding(&self) -> TableBinding {
        TableBinding::new(&self.warehouse.project, &self.quality.dataset)
    }

    /// Builds the declared units, in declaration order.
    pub fn ingestion_units(&self) -> Result<Vec<IngestionUnit>, DomainError> {
        let binding = self.raw_binding();
        self.ingestion
            .units
            .iter()
            .map(|cfg| -> Result<IngestionUnit, DomainError> {
                let source = self.resolve(&cfg.source);
                let operation = cfg
                    .operation
                    .clone()
                    .unwrap_or_else(|| cfg.normalizer.default_operation(&source));
                let destination = binding.resolve(&cfg.destination)?;

                let mut unit = IngestionUnit::new(
                    operation,
                    source,
                    destination,
                    Arc::new(cfg.normalizer.clone()),
                );
                for (set, table) in &cfg.outputs {
                    unit = unit.with_output(set.clone(), binding.resolve(table)?);
                }
                Ok(unit)
            })
            .collect()
    }
}

// --- LOADER ---

#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    load_project_config_with(project_dir, |key| std::env::var(key).ok())
}

fn load_project_config_with<F>(
    project_dir: &Path,
    lookup: F,
) -> Result<ProjectConfig, InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading project configuration");

    let mut config: ProjectConfig = load_fragment(&config_path)?;
    config.root = project_dir.to_path_buf();

    // Overrides go through the same rules as the file
    apply_env_overrides(&mut config, lookup);
    config.validate()?;

    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "{} (checked: {})",
        root.display(),
        CONFIG_CANDIDATES.join(", ")
    )))
}

/// Loads a typed YAML document from a file.
pub fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(InfrastructureError::YamlError)
}

// Layering: environment wins over the file, CLI flags win over both.
fn apply_env_overrides<F>(config: &mut ProjectConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("STRATA_WAREHOUSE_PATH") {
        info!(old = ?config.warehouse.path, new = ?val, "Overriding warehouse path via ENV");
        config.warehouse.path = val;
    }
    if let Some(val) = lookup("STRATA_PROJECT") {
        info!(old = ?config.warehouse.project, new = ?val, "Overriding project via ENV");
        config.warehouse.project = val;
    }
    if let Some(val) = lookup("STRATA_RAW_DATASET") {
        info!(old = ?config.ingestion.dataset, new = ?val, "Overriding raw dataset via ENV");
        config.ingestion.dataset = val;
    }
    if let Some(val) = lookup("STRATA_CURATED_DATASET") {
        info!(old = ?config.quality.dataset, new = ?val, "Overriding curated dataset via ENV");
        config.quality.dataset = val;
    }
    if let Some(val) = lookup("STRATA_LEDGER_PATH") {
        info!(old = ?config.ingestion.ledger, new = ?val, "Overriding ledger path via ENV");
        config.ingestion.ledger = val;
    }
}
