// strata-core/src/ports/normalizer.rs

use std::fmt::Debug;
use std::path::Path;

use crate::domain::error::MalformedInputError;
use crate::domain::records::NormalizedOutput;

/// Turns one source artifact into tabular records.
///
/// Implementations must not touch external state, and must be deterministic:
/// the same input bytes always yield the same output.
pub trait Normalize: Send + Sync + Debug {
    /// Short format tag used to derive default operation names (e.g. "csv").
    fn kind(&self) -> &'static str;

    fn read(&self, locator: &Path) -> Result<NormalizedOutput, MalformedInputError>;
}
