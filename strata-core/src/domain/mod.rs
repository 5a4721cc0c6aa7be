// strata-core/src/domain/mod.rs

pub mod error;
pub mod ingestion;
pub mod ledger;
pub mod quality;
pub mod records;
pub mod table;

pub use error::DomainError;
