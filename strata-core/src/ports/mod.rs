// strata-core/src/ports/mod.rs

// The outlets of the system: what ingestion and validation need from the
// outside world, without knowing which engine or file format provides it.

pub mod ledger;
pub mod normalizer;
pub mod warehouse;

pub use ledger::Ledger;
pub use normalizer::Normalize;
pub use warehouse::{Warehouse, WriteAck, WriteDisposition};
