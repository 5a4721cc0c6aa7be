// strata-core/src/ports/warehouse.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::SinkError;
use crate::domain::records::RecordSet;
use crate::domain::table::TableRef;
use crate::error::StrataError;

/// How a write treats rows already present in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteDisposition {
    #[default]
    Append,
    Truncate,
}

/// Durable acknowledgement of a completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAck {
    pub destinations: Vec<TableRef>,
    pub rows_written: usize,
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs a multi-statement script (DDL). Blocks until done or timed out.
    async fn execute_script(&self, sql: &str) -> Result<(), StrataError>;

    /// Runs a query and returns every row it produced.
    async fn query(&self, sql: &str) -> Result<RecordSet, StrataError>;

    /// Writes one record set. No retry, no schema validation: a mismatch
    /// surfaces as a `SinkError`.
    async fn write(
        &self,
        destination: TableRef,
        records: RecordSet,
        disposition: WriteDisposition,
    ) -> Result<WriteAck, SinkError> {
        self.write_many(vec![(destination, records)], disposition)
            .await
    }

    /// Writes several record sets as one unit of work. Engines with
    /// transactions make it all-or-nothing.
    async fn write_many(
        &self,
        batch: Vec<(TableRef, RecordSet)>,
        disposition: WriteDisposition,
    ) -> Result<WriteAck, SinkError>;

    fn engine_name(&self) -> &str;
}
