// strata-core/src/infrastructure/config/mod.rs

pub mod catalog;
pub mod project;

pub use catalog::load_catalog;
pub use project::{
    IngestionConfig, ProjectConfig, QualityConfig, UnitConfig, WarehouseConfig,
    load_project_config,
};
