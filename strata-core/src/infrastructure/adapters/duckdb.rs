// strata-core/src/infrastructure/adapters/duckdb.rs

// Warehouse adapter over an embedded DuckDB file. One file is one project:
// datasets map to schemas, the project part of a TableRef is not used.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate};
use duckdb::types::{TimeUnit, ToSqlOutput, Value};
use duckdb::{Config, Connection, ToSql, params_from_iter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::error::SinkError;
use crate::domain::records::{FieldValue, RecordSet};
use crate::domain::table::TableRef;
use crate::error::StrataError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::warehouse::{Warehouse, WriteAck, WriteDisposition};

/// Per-call ceiling used when the configuration does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Raised by the caller once a call outlives its ceiling. The worker checks it
/// between statements and before committing, so an abandoned write rolls back.
#[derive(Clone)]
struct Cancellation {
    flag: Arc<AtomicBool>,
    seconds: u64,
}

impl Cancellation {
    fn new(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            seconds: timeout.as_secs(),
        }
    }

    fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DatabaseError> {
        if self.flag.load(Ordering::SeqCst) {
            return Err(DatabaseError::Timeout {
                seconds: self.seconds,
            });
        }
        Ok(())
    }
}

pub struct DuckDbWarehouse {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl DuckDbWarehouse {
    pub fn new(db_path: &str, timeout: Duration) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::new(":memory:", DEFAULT_TIMEOUT)
    }

    // Runs `work` on the blocking pool with the connection locked, bounded by the timeout.
    // On timeout the worker is cancelled and awaited: the error is only returned
    // once its transaction is rolled back and the connection is free again.
    async fn blocking<T, F>(&self, work: F) -> Result<T, DatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection, &Cancellation) -> Result<T, DatabaseError> + Send + 'static,
    {
        let cancellation = Cancellation::new(self.timeout);
        let worker = cancellation.clone();
        let conn = Arc::clone(&self.conn);
        let mut handle = tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| DatabaseError::Poisoned)?;
            worker.check()?;
            work(&mut guard, &worker)
        });

        let joined = match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    seconds = self.timeout.as_secs(),
                    "Warehouse call exceeded its ceiling, cancelling"
                );
                cancellation.cancel();
                // A worker that committed before seeing the flag reports success
                handle.await
            }
        };

        joined.map_err(|join| DatabaseError::Join(join.to_string()))?
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    async fn execute_script(&self, sql: &str) -> Result<(), StrataError> {
        let sql = sql.to_string();
        self.blocking(move |conn, _| conn.execute_batch(&sql).map_err(DatabaseError::from))
            .await
            .map_err(StrataError::from)
    }

    async fn query(&self, sql: &str) -> Result<RecordSet, StrataError> {
        let sql = sql.to_string();
        self.blocking(move |conn, cancellation| read_records(conn, &sql, cancellation))
            .await
            .map_err(StrataError::from)
    }

    async fn write_many(
        &self,
        batch: Vec<(TableRef, RecordSet)>,
        disposition: WriteDisposition,
    ) -> Result<WriteAck, SinkError> {
        let targets = batch
            .iter()
            .map(|(t, _)| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let outcome = self
            .blocking(move |conn, cancellation| {
                Ok(write_batch(conn, batch, disposition, cancellation))
            })
            .await;

        match outcome {
            Ok(result) => result,
            Err(e) => Err(SinkError::new(targets, e.to_string())),
        }
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}

// All sets land in one transaction; dropping it on error or cancellation rolls
// everything back.
fn write_batch(
    conn: &mut Connection,
    batch: Vec<(TableRef, RecordSet)>,
    disposition: WriteDisposition,
    cancellation: &Cancellation,
) -> Result<WriteAck, SinkError> {
    let tx = conn
        .transaction()
        .map_err(|e| SinkError::new("transaction", e.to_string()))?;

    let mut destinations = Vec::with_capacity(batch.len());
    let mut rows_written = 0;

    for (table, records) in batch {
        let target = qualified(&table);
        let fail = |e: duckdb::Error| SinkError::new(table.to_string(), e.to_string());
        let cancelled = |e: DatabaseError| SinkError::new(table.to_string(), e.to_string());

        cancellation.check().map_err(cancelled)?;
        if disposition == WriteDisposition::Truncate {
            tx.execute(&format!("DELETE FROM {}", target), [])
                .map_err(fail)?;
        }

        if !records.columns().is_empty() && !records.is_empty() {
            let columns = records
                .columns()
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; records.columns().len()].join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                target, columns, placeholders
            );

            let mut stmt = tx.prepare(&sql).map_err(fail)?;
            for row in records.rows() {
                cancellation.check().map_err(cancelled)?;
                stmt.execute(params_from_iter(row.iter())).map_err(fail)?;
            }
        }

        debug!("Wrote {} rows to {}", records.len(), table);
        rows_written += records.len();
        destinations.push(table);
    }

    cancellation
        .check()
        .map_err(|e| SinkError::new("commit", e.to_string()))?;
    tx.commit()
        .map_err(|e| SinkError::new("commit", e.to_string()))?;

    Ok(WriteAck {
        destinations,
        rows_written,
    })
}

fn read_records(
    conn: &mut Connection,
    sql: &str,
    cancellation: &Cancellation,
) -> Result<RecordSet, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;

    let columns = rows
        .as_ref()
        .map(|s| s.column_names())
        .unwrap_or_default();
    let width = columns.len();
    let mut records = RecordSet::new(columns);

    while let Some(row) = rows.next()? {
        cancellation.check()?;
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(from_engine(row.get::<_, Value>(i)?));
        }
        records
            .push_row(values)
            .map_err(|e| DatabaseError::Join(format!("inconsistent result row: {}", e)))?;
    }

    Ok(records)
}

fn qualified(table: &TableRef) -> String {
    format!("{}.{}", quote(&table.dataset), quote(&table.table))
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn from_engine(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Boolean(v) => FieldValue::Bool(v),
        Value::TinyInt(v) => FieldValue::Int(v.into()),
        Value::SmallInt(v) => FieldValue::Int(v.into()),
        Value::Int(v) => FieldValue::Int(v.into()),
        Value::BigInt(v) => FieldValue::Int(v),
        Value::UTinyInt(v) => FieldValue::Int(v.into()),
        Value::USmallInt(v) => FieldValue::Int(v.into()),
        Value::UInt(v) => FieldValue::Int(v.into()),
        Value::UBigInt(v) => i64::try_from(v)
            .map(FieldValue::Int)
            .unwrap_or(FieldValue::Text(v.to_string())),
        Value::HugeInt(v) => i64::try_from(v)
            .map(FieldValue::Int)
            .unwrap_or(FieldValue::Text(v.to_string())),
        Value::Float(v) => FieldValue::Float(v.into()),
        Value::Double(v) => FieldValue::Float(v),
        Value::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .map(FieldValue::Float)
                .unwrap_or(FieldValue::Text(text))
        }
        Value::Text(v) | Value::Enum(v) => FieldValue::Text(v),
        Value::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
            .map(FieldValue::Date)
            .unwrap_or(FieldValue::Null),
        Value::Timestamp(unit, v) => {
            let micros = match unit {
                TimeUnit::Second => v.saturating_mul(1_000_000),
                TimeUnit::Millisecond => v.saturating_mul(1_000),
                TimeUnit::Microsecond => v,
                TimeUnit::Nanosecond => v / 1_000,
            };
            DateTime::from_timestamp_micros(micros)
                .map(|dt| FieldValue::Timestamp(dt.naive_utc()))
                .unwrap_or(FieldValue::Null)
        }
        other => FieldValue::Text(format!("{:?}", other)),
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(v) => Value::Boolean(*v),
            FieldValue::Int(v) => Value::BigInt(*v),
            FieldValue::Float(v) => Value::Double(*v),
            FieldValue::Text(v) => Value::Text(v.clone()),
            FieldValue::Date(d) => Value::Date32(d.num_days_from_ce() - EPOCH_DAYS_FROM_CE),
            FieldValue::Timestamp(ts) => {
                Value::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
            }
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::table::TableBinding;
    use anyhow::Result;
    use chrono::NaiveDateTime;

    const DDL: &str = "
        CREATE SCHEMA psa_raw;
        CREATE TABLE psa_raw.clientes (id_cliente INTEGER, nome VARCHAR, data_cadastro DATE);
        CREATE TABLE psa_raw.logs (id_log INTEGER, log_time TIMESTAMP);
    ";

    fn clientes(rows: Vec<(i64, &str)>) -> RecordSet {
        RecordSet::from_rows(
            vec!["id_cliente".into(), "nome".into(), "data_cadastro".into()],
            rows.into_iter()
                .map(|(id, nome)| {
                    vec![
                        FieldValue::Int(id),
                        FieldValue::text_or_null(nome),
                        FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
                    ]
                })
                .collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_write_then_query() -> Result<()> {
        let warehouse = DuckDbWarehouse::in_memory()?;
        warehouse.execute_script(DDL).await?;
        let table = TableBinding::new("psa", "psa_raw").table("clientes");

        let ack = warehouse
            .write(table.clone(), clientes(vec![(1, "Acme"), (2, "")]), WriteDisposition::Append)
            .await?;
        assert_eq!(ack.rows_written, 2);
        assert_eq!(ack.destinations, vec![table]);

        let result = warehouse
            .query("SELECT id_cliente, nome, data_cadastro FROM psa_raw.clientes ORDER BY id_cliente")
            .await?;
        assert_eq!(result.columns(), ["id_cliente", "nome", "data_cadastro"]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.value(0, "nome"), Some(&FieldValue::Text("Acme".into())));
        assert_eq!(result.value(1, "nome"), Some(&FieldValue::Null));
        assert_eq!(
            result.value(0, "data_cadastro"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_truncate_replaces_rows() -> Result<()> {
        let warehouse = DuckDbWarehouse::in_memory()?;
        warehouse.execute_script(DDL).await?;
        let table = TableBinding::new("psa", "psa_raw").table("clientes");

        warehouse
            .write(table.clone(), clientes(vec![(1, "a"), (2, "b")]), WriteDisposition::Append)
            .await?;
        warehouse
            .write(table, clientes(vec![(3, "c")]), WriteDisposition::Truncate)
            .await?;

        let result = warehouse.query("SELECT COUNT(*) AS n FROM psa_raw.clientes").await?;
        assert_eq!(result.value(0, "n"), Some(&FieldValue::Int(1)));
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() -> Result<()> {
        let warehouse = DuckDbWarehouse::in_memory()?;
        warehouse.execute_script(DDL).await?;
        let binding = TableBinding::new("psa", "psa_raw");

        let result = warehouse
            .write_many(
                vec![
                    (binding.table("clientes"), clientes(vec![(1, "a")])),
                    (binding.table("missing"), clientes(vec![(2, "b")])),
                ],
                WriteDisposition::Append,
            )
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.destination, "psa.psa_raw.missing");

        let count = warehouse.query("SELECT COUNT(*) FROM psa_raw.clientes").await?;
        assert_eq!(count.rows()[0][0], FieldValue::Int(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_past_its_ceiling_is_rolled_back() -> Result<()> {
        let warehouse = DuckDbWarehouse::in_memory()?;
        warehouse.execute_script(DDL).await?;
        let impatient = DuckDbWarehouse {
            conn: Arc::clone(&warehouse.conn),
            timeout: Duration::ZERO,
        };
        let table = TableBinding::new("psa", "psa_raw").table("clientes");
        let rows = (0..5_000).map(|i| (i, "x")).collect();

        let err = impatient
            .write(table.clone(), clientes(rows), WriteDisposition::Append)
            .await
            .unwrap_err();
        assert!(err.cause.contains("ceiling"), "unexpected cause: {}", err.cause);

        // Nothing landed, and the connection is free for the next unit
        let count = warehouse.query("SELECT COUNT(*) FROM psa_raw.clientes").await?;
        assert_eq!(count.rows()[0][0], FieldValue::Int(0));
        warehouse
            .write(table, clientes(vec![(1, "a")]), WriteDisposition::Append)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_batch_leaves_table_untouched() -> Result<()> {
        let warehouse = DuckDbWarehouse::in_memory()?;
        warehouse.execute_script(DDL).await?;
        let table = TableBinding::new("psa", "psa_raw").table("clientes");
        warehouse
            .write(table.clone(), clientes(vec![(1, "a")]), WriteDisposition::Append)
            .await?;

        let cancellation = Cancellation::new(Duration::from_secs(3));
        cancellation.cancel();
        let result = {
            let mut conn = warehouse.conn.lock().unwrap();
            write_batch(
                &mut conn,
                vec![(table.clone(), clientes(vec![(2, "b"), (3, "c")]))],
                WriteDisposition::Truncate,
                &cancellation,
            )
        };

        let err = result.unwrap_err();
        assert_eq!(err.destination, "psa.psa_raw.clientes");
        assert!(err.cause.contains("3s ceiling"));
        let ids = warehouse.query("SELECT id_cliente FROM psa_raw.clientes").await?;
        assert_eq!(ids.rows(), [vec![FieldValue::Int(1)]]);
        Ok(())
    }

    #[tokio::test]
    async fn test_timestamps_survive_the_round_trip() -> Result<()> {
        let warehouse = DuckDbWarehouse::in_memory()?;
        warehouse.execute_script(DDL).await?;
        let ts = NaiveDateTime::parse_from_str("2024-05-02 13:45:10", "%Y-%m-%d %H:%M:%S")?;
        let records = RecordSet::from_rows(
            vec!["id_log".into(), "log_time".into()],
            vec![vec![FieldValue::Int(7), FieldValue::Timestamp(ts)]],
        )
        .map_err(anyhow::Error::msg)?;

        warehouse
            .write(
                TableBinding::new("psa", "psa_raw").table("logs"),
                records,
                WriteDisposition::Append,
            )
            .await?;

        let result = warehouse.query("SELECT log_time FROM psa_raw.logs").await?;
        assert_eq!(result.rows()[0][0], FieldValue::Timestamp(ts));
        Ok(())
    }

    #[tokio::test]
    async fn test_duckdb_error() -> Result<()> {
        let warehouse = DuckDbWarehouse::in_memory()?;
        let result = warehouse.query("SELECT * FROM non_existent_table").await;
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_row_result_keeps_columns() -> Result<()> {
        let warehouse = DuckDbWarehouse::in_memory()?;
        let result = warehouse
            .query("SELECT 1 AS failures, 'x' AS sample WHERE 1 = 0")
            .await?;
        assert!(result.is_empty());
        assert_eq!(result.columns(), ["failures", "sample"]);
        Ok(())
    }
}
