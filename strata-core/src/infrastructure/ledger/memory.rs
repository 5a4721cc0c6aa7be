// strata-core/src/infrastructure/ledger/memory.rs

use std::sync::Mutex;

use crate::domain::ledger::{LedgerEntry, LedgerStatus, MonotonicClock};
use crate::error::StrataError;
use crate::ports::ledger::Ledger;

/// In-process ledger, for dry runs and tests.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<(MonotonicClock, Vec<LedgerEntry>)>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
    fn append(
        &self,
        operation: &str,
        table_id: &str,
        status: LedgerStatus,
        message: &str,
    ) -> Result<LedgerEntry, StrataError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StrataError::InternalError("ledger lock poisoned".into()))?;
        let (clock, entries) = &mut *state;

        let entry = LedgerEntry {
            timestamp: clock.now(),
            operation: operation.to_string(),
            table_id: table_id.to_string(),
            status,
            message: message.to_string(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, StrataError> {
        let state = self
            .state
            .lock()
            .map_err(|_| StrataError::InternalError("ledger lock poisoned".into()))?;
        Ok(state.1.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_are_kept_in_order() {
        let ledger = MemoryLedger::new();
        ledger.append("op", "t", LedgerStatus::Start, "a").unwrap();
        ledger.append("op", "t", LedgerStatus::Error, "b").unwrap();

        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].status, LedgerStatus::Error);
        assert!(entries[0].timestamp <= entries[1].timestamp);
    }
}
