// strata-core/src/domain/ingestion.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::error::DomainError;
use crate::domain::records::NormalizedOutput;
use crate::domain::records::RecordSet;
use crate::domain::table::TableRef;
use crate::ports::normalizer::Normalize;

/// One (source, destination) task. Immutable once declared.
#[derive(Debug, Clone)]
pub struct IngestionUnit {
    operation: String,
    source: PathBuf,
    destination: TableRef,
    outputs: BTreeMap<String, TableRef>,
    normalizer: Arc<dyn Normalize>,
}

impl IngestionUnit {
    pub fn new(
        operation: impl Into<String>,
        source: impl Into<PathBuf>,
        destination: TableRef,
        normalizer: Arc<dyn Normalize>,
    ) -> Self {
        Self {
            operation: operation.into(),
            source: source.into(),
            destination,
            outputs: BTreeMap::new(),
            normalizer,
        }
    }

    /// Explicit table for a named fan-out set, instead of `<destination>_<set>`.
    pub fn with_output(mut self, set: impl Into<String>, table: TableRef) -> Self {
        self.outputs.insert(set.into(), table);
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &TableRef {
        &self.destination
    }

    pub fn normalizer(&self) -> &dyn Normalize {
        self.normalizer.as_ref()
    }

    /// Pairs every produced record set with the table it lands in.
    pub fn plan_writes(
        &self,
        output: NormalizedOutput,
    ) -> Result<Vec<(TableRef, RecordSet)>, DomainError> {
        match output {
            NormalizedOutput::Single(set) => Ok(vec![(self.destination.clone(), set)]),
            NormalizedOutput::FanOut(sets) => {
                let mut planned: Vec<(TableRef, RecordSet)> = Vec::with_capacity(sets.len());
                for (name, set) in sets {
                    let table = self
                        .outputs
                        .get(&name)
                        .cloned()
                        .unwrap_or_else(|| self.destination.with_suffix(&name));
                    if planned.iter().any(|(t, _)| *t == table) {
                        return Err(DomainError::InvalidUnit(format!(
                            "unit '{}' routes two record sets to {}",
                            self.operation, table
                        )));
                    }
                    planned.push((table, set));
                }
                Ok(planned)
            }
        }
    }
}

/// Lifecycle of a unit inside one run: PENDING -> RUNNING -> {SUCCEEDED, FAILED}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitState {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl UnitState {
    pub fn start(self) -> Result<Self, DomainError> {
        match self {
            Self::Pending => Ok(Self::Running),
            other => Err(DomainError::InvalidUnit(format!(
                "cannot start a unit in state {}",
                other
            ))),
        }
    }

    pub fn finish(self, succeeded: bool) -> Result<Self, DomainError> {
        match (self, succeeded) {
            (Self::Running, true) => Ok(Self::Succeeded),
            (Self::Running, false) => Ok(Self::Failed),
            (other, _) => Err(DomainError::InvalidUnit(format!(
                "cannot finish a unit in state {}",
                other
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        };
        write!(f, "{}", label)
    }
}
