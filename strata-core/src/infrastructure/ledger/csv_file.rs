// strata-core/src/infrastructure/ledger/csv_file.rs

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::domain::ledger::{LEDGER_HEADER, LedgerEntry, LedgerStatus, MonotonicClock};
use crate::error::StrataError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::ledger::Ledger;

/// Append-only CSV ledger. The header is written once, when the file is new
/// or empty; each append opens, writes, flushes and closes the file.
pub struct CsvLedger {
    path: PathBuf,
    clock: Mutex<MonotonicClock>,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clock: Mutex::new(MonotonicClock::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_for_append(&self) -> Result<(File, bool), InfrastructureError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok((file, needs_header))
    }
}

impl Ledger for CsvLedger {
    fn append(
        &self,
        operation: &str,
        table_id: &str,
        status: LedgerStatus,
        message: &str,
    ) -> Result<LedgerEntry, StrataError> {
        // The clock lock doubles as the append lock: one writer at a time.
        let mut clock = self
            .clock
            .lock()
            .map_err(|_| StrataError::InternalError("ledger lock poisoned".into()))?;

        let entry = LedgerEntry {
            timestamp: clock.now(),
            operation: operation.to_string(),
            table_id: table_id.to_string(),
            status,
            message: message.to_string(),
        };

        let (file, needs_header) = self.open_for_append()?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer
                .write_record(LEDGER_HEADER)
                .map_err(InfrastructureError::from)?;
        }
        writer
            .write_record([
                entry.timestamp.to_rfc3339(),
                entry.operation.clone(),
                entry.table_id.clone(),
                entry.status.as_str().to_string(),
                entry.message.clone(),
            ])
            .map_err(InfrastructureError::from)?;
        writer.flush().map_err(InfrastructureError::from)?;

        debug!(operation, table_id, status = %status, "ledger entry appended");
        Ok(entry)
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, StrataError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(InfrastructureError::from)?;

        let mut entries = Vec::new();
        for record in reader.deserialize::<LedgerEntry>() {
            entries.push(record.map_err(InfrastructureError::from)?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_header_written_once() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("logs").join("pipeline_ingestion.csv");

        let ledger = CsvLedger::new(&path);
        ledger.append("load_raw_csv", "p.psa_raw.clientes", LedgerStatus::Start, "reading data/clientes.csv")?;
        ledger.append("load_raw_csv", "p.psa_raw.clientes", LedgerStatus::Success, "ok")?;

        // A second process appending to the same file.
        let again = CsvLedger::new(&path);
        again.append("load_raw_txt", "p.psa_raw.analises", LedgerStatus::Error, "boom, with comma")?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "timestamp,operation,table_id,status,message");
        assert_eq!(content.matches("timestamp,operation").count(), 1);
        assert!(lines[3].ends_with("ERROR,\"boom, with comma\""));
        Ok(())
    }

    #[test]
    fn test_entries_round_trip_in_order() -> Result<()> {
        let dir = tempdir()?;
        let ledger = CsvLedger::new(dir.path().join("ledger.csv"));
        assert!(ledger.entries()?.is_empty());

        ledger.append("op", "t1", LedgerStatus::Start, "reading")?;
        ledger.append("op", "t1", LedgerStatus::Success, "t1 loaded successfully (3 rows)")?;

        let entries = ledger.entries()?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, LedgerStatus::Start);
        assert_eq!(entries[1].message, "t1 loaded successfully (3 rows)");
        assert!(entries[0].timestamp <= entries[1].timestamp);
        Ok(())
    }

    #[test]
    fn test_existing_empty_file_gets_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ledger.csv");
        fs::write(&path, "")?;

        CsvLedger::new(&path).append("op", "t", LedgerStatus::Start, "m")?;
        assert!(fs::read_to_string(&path)?.starts_with("timestamp,"));
        Ok(())
    }
}
