// strata/src/commands/mod.rs

pub mod audit;
pub mod check;
pub mod checks;
pub mod ingest;
