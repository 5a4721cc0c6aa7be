// strata-core/src/application/quality.rs

// Executes every catalog check against one project/dataset binding.
// A check that cannot produce a count becomes an ERROR result; nothing a
// single check does can stop the others from running.

use tracing::{error, info, instrument, warn};

use crate::application::ports::TemplateEngine;
use crate::domain::error::CheckError;
use crate::domain::quality::{CheckResult, CheckStatus, QualityCatalog, QualityCheck};
use crate::domain::records::{FieldValue, RecordSet};
use crate::domain::table::TableBinding;
use crate::ports::warehouse::Warehouse;

/// Results of one validation run, in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityReport {
    pub results: Vec<CheckResult>,
}

impl QualityReport {
    /// The run's exit signal: any FAIL or ERROR.
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(CheckResult::is_problem)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status() == status).count()
    }
}

pub struct QualityRunner<'a> {
    warehouse: &'a dyn Warehouse,
    renderer: &'a dyn TemplateEngine,
}

impl<'a> QualityRunner<'a> {
    pub fn new(warehouse: &'a dyn Warehouse, renderer: &'a dyn TemplateEngine) -> Self {
        Self {
            warehouse,
            renderer,
        }
    }

    fn render(&self, check: &QualityCheck, binding: &TableBinding) -> Result<String, CheckError> {
        let context = self.renderer.context(binding);
        self.renderer
            .render(check.query_template(), &context)
            .map_err(|e| CheckError::QueryExecution(e.to_string()))
    }

    #[instrument(skip_all, fields(checks = catalog.len(), dataset = %binding.dataset))]
    pub async fn run(&self, catalog: &QualityCatalog, binding: &TableBinding) -> QualityReport {
        let mut report = QualityReport::default();
        for check in catalog.checks() {
            let result = match self.execute(check, binding).await {
                Ok((failures, sample)) => CheckResult::counted(check, failures, sample),
                Err(e) => CheckResult::errored(check, &e),
            };
            match result.status() {
                CheckStatus::Pass => info!(check = check.name(), "PASS"),
                CheckStatus::Fail => warn!(
                    check = check.name(),
                    failures = result.failures().unwrap_or_default(),
                    severity = %check.severity(),
                    "FAIL"
                ),
                CheckStatus::Error => error!(
                    check = check.name(),
                    error = result.error().unwrap_or_default(),
                    "ERROR"
                ),
            }
            report.results.push(result);
        }
        report
    }

    async fn execute(
        &self,
        check: &QualityCheck,
        binding: &TableBinding,
    ) -> Result<(u64, Option<String>), CheckError> {
        let sql = self.render(check, binding)?;
        let rows = self
            .warehouse
            .query(&sql)
            .await
            .map_err(|e| CheckError::QueryExecution(e.to_string()))?;
        read_verdict(&rows)
    }
}

/// Enforces the one-row `(failures, sample)` protocol on a query result.
pub fn read_verdict(rows: &RecordSet) -> Result<(u64, Option<String>), CheckError> {
    match rows.len() {
        0 => {
            return Err(CheckError::ProtocolViolation(
                "query did not return any rows".into(),
            ));
        }
        1 => {}
        n => {
            return Err(CheckError::ProtocolViolation(format!(
                "query returned {} rows, expected exactly one",
                n
            )));
        }
    }

    let failures_idx = rows.column_index("failures").unwrap_or(0);
    let failures = match rows.rows()[0].get(failures_idx) {
        Some(value) => value.as_i64(),
        None => {
            return Err(CheckError::ProtocolViolation(
                "query returned no columns".into(),
            ));
        }
    };
    let failures = failures
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| {
            CheckError::ProtocolViolation(
                "failure count is missing, negative or not an integer".into(),
            )
        })?;

    let sample_idx = rows
        .column_index("sample")
        .or_else(|| (rows.columns().len() > 1).then_some(1));
    let sample = sample_idx
        .and_then(|i| rows.rows()[0].get(i))
        .and_then(|value| match value {
            FieldValue::Null => None,
            other => Some(other.to_string()),
        });

    Ok((failures, sample))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::quality::CheckDeclaration;
    use crate::infrastructure::adapters::duckdb::DuckDbWarehouse;
    use crate::infrastructure::compiler::jinja::JinjaRenderer;
    use anyhow::Result;

    const SEED: &str = "
        CREATE SCHEMA psa_curated;
        CREATE TABLE psa_curated.cliente (id_cliente INTEGER, cnpj VARCHAR);
        INSERT INTO psa_curated.cliente VALUES (1, '12345678000190'), (1, '12345678000190'), (2, '123');
        CREATE TABLE psa_curated.projeto (id_projeto INTEGER, id_cliente INTEGER);
        INSERT INTO psa_curated.projeto VALUES (10, 1), (11, 99), (12, 99);
    ";

    fn catalog(yaml: &str) -> QualityCatalog {
        let decls: Vec<CheckDeclaration> = serde_yaml::from_str(yaml).unwrap();
        QualityCatalog::compile(decls).unwrap()
    }

    async fn seeded() -> Result<DuckDbWarehouse> {
        let warehouse = DuckDbWarehouse::in_memory()?;
        warehouse.execute_script(SEED).await?;
        Ok(warehouse)
    }

    fn binding() -> TableBinding {
        TableBinding::new("psa-data", "psa_curated")
    }

    #[tokio::test]
    async fn test_uniqueness_counts_duplicated_groups() -> Result<()> {
        let warehouse = seeded().await?;
        let renderer = JinjaRenderer::new();
        let catalog = catalog(
            r#"
- name: cliente_duplicate_id
  severity: CRITICAL
  rule: { shape: uniqueness, table: cliente, columns: [id_cliente] }
"#,
        );

        let report = QualityRunner::new(&warehouse, &renderer).run(&catalog, &binding()).await;
        let result = &report.results[0];
        assert_eq!(result.status(), CheckStatus::Fail);
        assert_eq!(result.failures(), Some(1));
        assert_eq!(result.sample(), Some("1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_referential_integrity_reports_orphans() -> Result<()> {
        let warehouse = seeded().await?;
        let renderer = JinjaRenderer::new();
        let catalog = catalog(
            r#"
- name: projeto_orphan_cliente
  severity: HIGH
  rule:
    shape: referential_integrity
    table: projeto
    column: id_cliente
    parent_table: cliente
    parent_column: id_cliente
"#,
        );

        let report = QualityRunner::new(&warehouse, &renderer).run(&catalog, &binding()).await;
        let result = &report.results[0];
        assert_eq!(result.status(), CheckStatus::Fail);
        assert_eq!(result.failures(), Some(2));
        assert_eq!(result.sample(), Some("99"));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_check_does_not_stop_the_others() -> Result<()> {
        let warehouse = seeded().await?;
        let renderer = JinjaRenderer::new();
        let catalog = catalog(
            r#"
- name: cliente_cnpj_format
  severity: CRITICAL
  rule:
    shape: field_validity
    table: cliente
    key: id_cliente
    formats: [{ column: cnpj, length: 14 }]
- name: broken
  severity: LOW
  rule: { shape: custom, query: "SELECT COUNT(*) FROM {{ table('does_not_exist') }}" }
- name: projeto_present
  severity: LOW
  rule: { shape: field_validity, table: projeto, key: id_projeto, required: [id_projeto] }
"#,
        );

        let report = QualityRunner::new(&warehouse, &renderer).run(&catalog, &binding()).await;
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[0].status(), CheckStatus::Fail);
        assert_eq!(report.results[0].sample(), Some("2"));
        assert_eq!(report.results[1].status(), CheckStatus::Error);
        assert!(report.results[1].error().unwrap().contains("does_not_exist"));
        assert_eq!(report.results[2].status(), CheckStatus::Pass);
        assert_eq!(report.results[2].sample(), None);
        assert!(report.has_failures());
        assert_eq!(report.count(CheckStatus::Error), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_sample_keys_may_contain_commas() -> Result<()> {
        let warehouse = seeded().await?;
        warehouse
            .execute_script(
                "CREATE TABLE psa_curated.fornecedor (razao_social VARCHAR);
                 INSERT INTO psa_curated.fornecedor
                 SELECT name FROM (VALUES ('Alfa, Ltda'), ('Beta, SA'), ('Gama, ME'),
                                          ('Delta, Eireli'), ('Epsilon, SA'), ('Zeta, Ltda')) AS t(name),
                                  range(2);",
            )
            .await?;
        let renderer = JinjaRenderer::new();
        let catalog = catalog(
            r#"
- name: fornecedor_duplicate_name
  severity: HIGH
  rule: { shape: uniqueness, table: fornecedor, columns: [razao_social] }
"#,
        );

        let report = QualityRunner::new(&warehouse, &renderer).run(&catalog, &binding()).await;
        let result = &report.results[0];
        assert_eq!(result.failures(), Some(6));
        assert_eq!(
            result.sample(),
            Some("Alfa, Ltda, Beta, SA, Delta, Eireli, Epsilon, SA, Gama, ME")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_rows_is_a_protocol_violation() -> Result<()> {
        let warehouse = seeded().await?;
        let renderer = JinjaRenderer::new();
        let catalog = catalog(
            r#"
- name: empty
  severity: LOW
  rule: { shape: custom, query: "SELECT 0 AS failures, NULL AS sample WHERE 1 = 0" }
"#,
        );

        let report = QualityRunner::new(&warehouse, &renderer).run(&catalog, &binding()).await;
        assert_eq!(report.results[0].status(), CheckStatus::Error);
        assert_eq!(report.results[0].error(), Some("query did not return any rows"));
        assert_eq!(report.results[0].failures(), None);
        Ok(())
    }

    #[test]
    fn test_verdict_rejects_null_and_negative_counts() {
        let null = RecordSet::from_rows(
            vec!["failures".into(), "sample".into()],
            vec![vec![FieldValue::Null, FieldValue::Null]],
        )
        .unwrap();
        assert!(read_verdict(&null).is_err());

        let negative =
            RecordSet::from_rows(vec!["failures".into()], vec![vec![FieldValue::Int(-1)]]).unwrap();
        assert!(read_verdict(&negative).is_err());

        let two = RecordSet::from_rows(
            vec!["failures".into()],
            vec![vec![FieldValue::Int(0)], vec![FieldValue::Int(0)]],
        )
        .unwrap();
        assert!(matches!(
            read_verdict(&two),
            Err(CheckError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_verdict_falls_back_to_positions() {
        let rows = RecordSet::from_rows(
            vec!["n".into(), "keys".into()],
            vec![vec![FieldValue::Int(3), FieldValue::Text("a, b, c".into())]],
        )
        .unwrap();
        assert_eq!(read_verdict(&rows).unwrap(), (3, Some("a, b, c".to_string())));
    }
}
