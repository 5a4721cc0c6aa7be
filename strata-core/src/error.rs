// strata-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    // --- DOMAIN ERRORS (preconditions, catalog and unit declarations) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, engine, parsing) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

// Keeps `?` ergonomic on std::io calls without a duplicate enum variant
impl From<std::io::Error> for StrataError {
    fn from(err: std::io::Error) -> Self {
        StrataError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<crate::infrastructure::error::DatabaseError> for StrataError {
    fn from(err: crate::infrastructure::error::DatabaseError) -> Self {
        StrataError::Infrastructure(InfrastructureError::Database(err))
    }
}
