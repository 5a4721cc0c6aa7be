// strata-core/src/ports/ledger.rs

use crate::domain::ledger::{LedgerEntry, LedgerStatus};
use crate::error::StrataError;

/// Append-only audit log of unit lifecycle events.
///
/// Appends are serialized by the implementation; entries are never rewritten.
pub trait Ledger: Send + Sync {
    fn append(
        &self,
        operation: &str,
        table_id: &str,
        status: LedgerStatus,
        message: &str,
    ) -> Result<LedgerEntry, StrataError>;

    /// Reads back every entry, oldest first.
    fn entries(&self) -> Result<Vec<LedgerEntry>, StrataError>;
}
