// strata-core/src/lib.rs

// 1. Documentation is not mandatory yet
#![allow(missing_docs)]
// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts with the outside world: Warehouse, Ledger, Normalize.
pub mod ports;

// 2. Domain (business core)
// Records, ingestion units, ledger entries, quality checks and rule shapes.
// Depends on nothing but the ports.
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB, CSV ledger, format normalizers, YAML config, Jinja.
pub mod infrastructure;

// 4. Application (Use Cases)
// Ingestion orchestrator, quality runner, reports, ledger audit.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use strata_core::StrataError;
pub use error::StrataError;
