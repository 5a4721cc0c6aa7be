// strata-core/src/domain/ledger.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed header of the ledger file, in column order.
pub const LEDGER_HEADER: [&str; 5] = ["timestamp", "operation", "table_id", "status", "message"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerStatus {
    Start,
    Success,
    Error,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Start)
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One lifecycle event. Field order matches `LEDGER_HEADER`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub table_id: String,
    pub status: LedgerStatus,
    pub message: String,
}

/// Hands out UTC timestamps that never go backwards, even if the wall clock does.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Option<DateTime<Utc>>,
}

impl MonotonicClock {
    pub fn now(&mut self) -> DateTime<Utc> {
        self.tick(Utc::now())
    }

    pub fn tick(&mut self, observed: DateTime<Utc>) -> DateTime<Utc> {
        let next = match self.last {
            Some(last) if last > observed => last,
            _ => observed,
        };
        self.last = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_clock_never_goes_backwards() {
        let mut clock = MonotonicClock::default();
        let t0 = Utc::now();
        assert_eq!(clock.tick(t0), t0);
        assert_eq!(clock.tick(t0 - Duration::seconds(5)), t0);
        let later = t0 + Duration::seconds(1);
        assert_eq!(clock.tick(later), later);
    }

    #[test]
    fn test_status_terminality() {
        assert!(!LedgerStatus::Start.is_terminal());
        assert!(LedgerStatus::Success.is_terminal());
        assert!(LedgerStatus::Error.is_terminal());
        assert_eq!(LedgerStatus::Error.to_string(), "ERROR");
    }
}
