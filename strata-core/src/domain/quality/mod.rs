// strata-core/src/domain/quality/mod.rs

pub mod catalog;
pub mod check;
pub mod rule;

pub use catalog::{CheckDeclaration, QualityCatalog};
pub use check::{CheckResult, CheckStatus, QualityCheck, SAMPLE_LIMIT, Severity};
pub use rule::RuleShape;
