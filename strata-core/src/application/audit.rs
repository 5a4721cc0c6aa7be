// strata-core/src/application/audit.rs

// Post-hoc reading of the run ledger.

use std::collections::BTreeMap;

use crate::domain::ledger::{LedgerEntry, LedgerStatus};

/// SUCCESS/ERROR tally for one destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableTally {
    pub succeeded: usize,
    pub failed: usize,
}

/// A unit whose last START was never followed by a terminal entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IncompleteUnit {
    pub operation: String,
    pub table_id: String,
    pub started: LedgerEntry,
}

/// Units that crashed or were killed mid-flight, in order of their last START.
pub fn incomplete_units(entries: &[LedgerEntry]) -> Vec<IncompleteUnit> {
    let mut open: BTreeMap<(&str, &str), (usize, &LedgerEntry)> = BTreeMap::new();
    for (position, entry) in entries.iter().enumerate() {
        let key = (entry.operation.as_str(), entry.table_id.as_str());
        if entry.status.is_terminal() {
            open.remove(&key);
        } else {
            open.insert(key, (position, entry));
        }
    }

    let mut pending: Vec<(usize, &LedgerEntry)> = open.into_values().collect();
    pending.sort_by_key(|(position, _)| *position);
    pending
        .into_iter()
        .map(|(_, entry)| IncompleteUnit {
            operation: entry.operation.clone(),
            table_id: entry.table_id.clone(),
            started: entry.clone(),
        })
        .collect()
}

pub fn summarize(entries: &[LedgerEntry]) -> BTreeMap<String, TableTally> {
    let mut tallies: BTreeMap<String, TableTally> = BTreeMap::new();
    for entry in entries {
        let tally = tallies.entry(entry.table_id.clone()).or_default();
        match entry.status {
            LedgerStatus::Success => tally.succeeded += 1,
            LedgerStatus::Error => tally.failed += 1,
            LedgerStatus::Start => {}
        }
    }
    tallies
}
