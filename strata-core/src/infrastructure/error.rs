// strata-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(strata::infra::database::duckdb),
        help("An error occurred inside the SQL engine.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("Warehouse call exceeded the {seconds}s ceiling")]
    #[diagnostic(
        code(strata::infra::database::timeout),
        help("Raise 'warehouse.timeout_secs' or reduce the unit size.")
    )]
    Timeout { seconds: u64 },

    #[error("DuckDB connection mutex poisoned")]
    #[diagnostic(code(strata::infra::database::poisoned))]
    Poisoned,

    #[error("Warehouse worker crashed: {0}")]
    #[diagnostic(code(strata::infra::database::join))]
    Join(String),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(strata::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(strata::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(strata::infra::json))]
    JsonError(#[from] serde_json::Error),

    #[error("Ledger file Error: {0}")]
    #[diagnostic(
        code(strata::infra::ledger),
        help("The ledger is an append-only CSV; do not edit it by hand.")
    )]
    LedgerError(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(strata::infra::config_invalid))]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Project configuration not found at '{0}'")]
    #[diagnostic(code(strata::infra::config_missing))]
    ConfigNotFound(String),

    // --- TEMPLATING ---
    #[error("Template Rendering Error: {0}")]
    #[diagnostic(
        code(strata::infra::template),
        help("Check the Jinja syntax ({{ ... }}) of the check query.")
    )]
    TemplateError(#[from] minijinja::Error),
}

// Shortcut for `?` on duckdb calls
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
