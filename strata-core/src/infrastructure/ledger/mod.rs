// strata-core/src/infrastructure/ledger/mod.rs

pub mod csv_file;
pub mod memory;

pub use csv_file::CsvLedger;
pub use memory::MemoryLedger;
