// strata-core/src/application/mod.rs

pub mod audit;
pub mod ingestion;
pub mod ports;
pub mod quality;
pub mod report;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI write `use strata_core::application::{IngestionOrchestrator, QualityRunner};`
// without knowing the internal file layout.

pub use audit::{incomplete_units, summarize};
pub use ingestion::{IngestionOrchestrator, IngestionReport, UnitReport, run_schema_script};
pub use quality::{QualityReport, QualityRunner};
