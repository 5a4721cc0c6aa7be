// strata-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

/// A source artifact could not be turned into records.
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
#[error("malformed input: {cause}")]
#[diagnostic(
    code(strata::domain::malformed_input),
    help("Fix the source file '{locator}' and re-run the unit.")
)]
pub struct MalformedInputError {
    pub locator: String,
    pub cause: String,
}

impl MalformedInputError {
    pub fn new(locator: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            cause: cause.into(),
        }
    }
}

/// The warehouse refused or failed a table write.
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
#[error("write to '{destination}' failed: {cause}")]
#[diagnostic(
    code(strata::domain::sink),
    help("Check that the destination table exists and matches the record set columns.")
)]
pub struct SinkError {
    pub destination: String,
    pub cause: String,
}

impl SinkError {
    pub fn new(destination: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            cause: cause.into(),
        }
    }
}

/// Why a single ingestion unit failed. Never escapes the unit boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error(transparent)]
    Malformed(#[from] MalformedInputError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Why a single quality check could not produce a failure count.
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum CheckError {
    #[error("{0}")]
    #[diagnostic(
        code(strata::domain::protocol_violation),
        help("A check query must return exactly one row: (failures, sample).")
    )]
    ProtocolViolation(String),

    #[error("{0}")]
    #[diagnostic(code(strata::domain::query_execution))]
    QueryExecution(String),
}

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Precondition failed: {0}")]
    #[diagnostic(
        code(strata::domain::precondition),
        help("The schema definition script must exist and run cleanly before any unit.")
    )]
    PreconditionFailed(String),

    #[error("Invalid quality catalog: {0}")]
    #[diagnostic(code(strata::domain::catalog))]
    InvalidCatalog(String),

    #[error("Invalid ingestion unit: {0}")]
    #[diagnostic(code(strata::domain::unit))]
    InvalidUnit(String),

    #[error("Invalid table reference '{0}'")]
    #[diagnostic(
        code(strata::domain::table_ref),
        help("Use 'table', 'dataset.table' or 'project.dataset.table'.")
    )]
    InvalidTableRef(String),
}
