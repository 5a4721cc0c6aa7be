// strata-core/src/application/ingestion.rs

// Runs ingestion units strictly in declared order. Each unit is a small
// state machine (PENDING -> RUNNING -> SUCCEEDED | FAILED) whose START and
// terminal ledger entries bracket its work. A unit failure is recorded and the
// loop moves on; only the schema precondition and the ledger itself can abort.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::error::{DomainError, IngestError, SinkError};
use crate::domain::ingestion::{IngestionUnit, UnitState};
use crate::domain::ledger::LedgerStatus;
use crate::domain::table::TableRef;
use crate::error::StrataError;
use crate::ports::ledger::Ledger;
use crate::ports::warehouse::{Warehouse, WriteAck, WriteDisposition};

pub const SCHEMA_OPERATION: &str = "run_schema_script";

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub operation: String,
    pub source: PathBuf,
    pub destination: TableRef,
    pub state: UnitState,
    pub rows_written: usize,
    pub error: Option<String>,
}

/// Outcome of one run, one entry per declared unit, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub outcomes: Vec<UnitReport>,
}

impl IngestionReport {
    pub fn has_errors(&self) -> bool {
        self.outcomes.iter().any(|o| o.state == UnitState::Failed)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == UnitState::Succeeded)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == UnitState::Failed)
            .count()
    }

    pub fn rows_written(&self) -> usize {
        self.outcomes.iter().map(|o| o.rows_written).sum()
    }
}

pub struct IngestionOrchestrator<'a> {
    warehouse: &'a dyn Warehouse,
    ledger: &'a dyn Ledger,
    disposition: WriteDisposition,
}

impl<'a> IngestionOrchestrator<'a> {
    pub fn new(warehouse: &'a dyn Warehouse, ledger: &'a dyn Ledger) -> Self {
        Self {
            warehouse,
            ledger,
            disposition: WriteDisposition::default(),
        }
    }

    pub fn with_disposition(mut self, disposition: WriteDisposition) -> Self {
        self.disposition = disposition;
        self
    }

    /// Folds over the units. `Err` only when the ledger cannot be written:
    /// without it the audit trail would silently lose entries.
    #[instrument(skip_all, fields(units = units.len(), engine = self.warehouse.engine_name()))]
    pub async fn run(&self, units: &[IngestionUnit]) -> Result<IngestionReport, StrataError> {
        let mut report = IngestionReport::default();
        for unit in units {
            let outcome = self.run_unit(unit).await?;
            report.outcomes.push(outcome);
        }
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            rows = report.rows_written(),
            "Ingestion run finished"
        );
        Ok(report)
    }

    async fn run_unit(&self, unit: &IngestionUnit) -> Result<UnitReport, StrataError> {
        let table_id = unit.destination().to_string();
        let source = unit.source().display().to_string();

        let state = UnitState::Pending.start()?;
        self.ledger.append(
            unit.operation(),
            &table_id,
            LedgerStatus::Start,
            &format!("reading {}", source),
        )?;
        info!(operation = unit.operation(), destination = %table_id, "Unit started");

        let (state, rows_written, error) = match self.process(unit).await {
            Ok(ack) => {
                let loaded = ack
                    .destinations
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.ledger.append(
                    unit.operation(),
                    &table_id,
                    LedgerStatus::Success,
                    &format!("{} loaded successfully ({} rows)", loaded, ack.rows_written),
                )?;
                info!(destination = %table_id, rows = ack.rows_written, "Unit succeeded");
                (state.finish(true)?, ack.rows_written, None)
            }
            Err(e) => {
                let message = format!("failed to process {}: {}", source, e);
                self.ledger
                    .append(unit.operation(), &table_id, LedgerStatus::Error, &message)?;
                match &e {
                    IngestError::Malformed(_) => warn!(destination = %table_id, "{}", message),
                    IngestError::Sink(_) => error!(destination = %table_id, "{}", message),
                }
                (state.finish(false)?, 0, Some(e.to_string()))
            }
        };

        Ok(UnitReport {
            operation: unit.operation().to_string(),
            source: unit.source().to_path_buf(),
            destination: unit.destination().clone(),
            state,
            rows_written,
            error,
        })
    }

    async fn process(&self, unit: &IngestionUnit) -> Result<WriteAck, IngestError> {
        let output = unit.normalizer().read(unit.source())?;
        debug!(
            normalizer = unit.normalizer().kind(),
            rows = output.total_rows(),
            "Source normalized"
        );
        let writes = unit
            .plan_writes(output)
            .map_err(|e| SinkError::new(unit.destination().to_string(), e.to_string()))?;
        let ack = self.warehouse.write_many(writes, self.disposition).await?;
        Ok(ack)
    }
}

/// Schema precondition: the DDL script must exist and run cleanly before any
/// unit. Logged to the ledger under the script's file name.
pub async fn run_schema_script(
    warehouse: &dyn Warehouse,
    ledger: &dyn Ledger,
    script: &Path,
) -> Result<(), StrataError> {
    let table_id = script
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| script.display().to_string());

    if !script.exists() {
        let message = format!("schema script not found: {}", script.display());
        ledger.append(SCHEMA_OPERATION, &table_id, LedgerStatus::Error, &message)?;
        error!("{}", message);
        return Err(DomainError::PreconditionFailed(message).into());
    }

    ledger.append(
        SCHEMA_OPERATION,
        &table_id,
        LedgerStatus::Start,
        &format!("executing {}", script.display()),
    )?;

    let outcome = match fs::read_to_string(script) {
        Ok(sql) => warehouse.execute_script(&sql).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok(()) => {
            ledger.append(
                SCHEMA_OPERATION,
                &table_id,
                LedgerStatus::Success,
                "schema script executed",
            )?;
            info!(script = %table_id, "Schema script executed");
            Ok(())
        }
        Err(cause) => {
            let message = format!("failed to run {}: {}", table_id, cause);
            ledger.append(SCHEMA_OPERATION, &table_id, LedgerStatus::Error, &message)?;
            error!("{}", message);
            Err(DomainError::PreconditionFailed(message).into())
        }
    }
}
