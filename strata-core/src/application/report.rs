// strata-core/src/application/report.rs

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use crate::domain::quality::{CheckResult, CheckStatus, Severity};
use crate::error::StrataError;
use crate::infrastructure::error::InfrastructureError;

const CHECK_WIDTH: u16 = 35;
const SEVERITY_WIDTH: u16 = 10;
const STATUS_WIDTH: u16 = 8;
const FAILURES_WIDTH: u16 = 10;

/// Fixed-width table for interactive use.
pub fn render_table(results: &[CheckResult]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(vec![
            header_cell("Check"),
            header_cell("Severity"),
            header_cell("Status"),
            header_cell("Failures"),
            header_cell("Sample / Error"),
        ])
        .set_constraints(vec![
            ColumnConstraint::Absolute(Width::Fixed(CHECK_WIDTH)),
            ColumnConstraint::Absolute(Width::Fixed(SEVERITY_WIDTH)),
            ColumnConstraint::Absolute(Width::Fixed(STATUS_WIDTH)),
            ColumnConstraint::Absolute(Width::Fixed(FAILURES_WIDTH)),
        ]);

    for result in results {
        let detail = match result.status() {
            CheckStatus::Error => result.error().unwrap_or_default(),
            _ => result.sample().unwrap_or("-"),
        };
        table.add_row(vec![
            Cell::new(result.name()),
            severity_cell(result.severity()),
            status_cell(result.status()),
            failures_cell(result.failures()),
            Cell::new(detail),
        ]);
    }

    if let Some(column) = table.column_mut(3) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    table.to_string()
}

/// One-line tally: `7 checks: 5 passed, 1 failed, 1 errored`.
pub fn summary_line(results: &[CheckResult]) -> String {
    let count = |status| results.iter().filter(|r| r.status() == status).count();
    format!(
        "{} checks: {} passed, {} failed, {} errored",
        results.len(),
        count(CheckStatus::Pass),
        count(CheckStatus::Fail),
        count(CheckStatus::Error)
    )
}

/// JSON array of results, fields as in `CheckResult`.
pub fn to_json(results: &[CheckResult]) -> Result<String, StrataError> {
    serde_json::to_string_pretty(results)
        .map_err(|e| StrataError::Infrastructure(InfrastructureError::JsonError(e)))
}

/// Reads back a JSON report; inconsistent statuses are rejected.
pub fn from_json(content: &str) -> Result<Vec<CheckResult>, StrataError> {
    serde_json::from_str(content)
        .map_err(|e| StrataError::Infrastructure(InfrastructureError::JsonError(e)))
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn status_cell(status: CheckStatus) -> Cell {
    let color = match status {
        CheckStatus::Pass => Color::Green,
        CheckStatus::Fail => Color::Red,
        CheckStatus::Error => Color::Magenta,
    };
    Cell::new(status.as_str())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

fn severity_cell(severity: Severity) -> Cell {
    match severity {
        Severity::Critical => Cell::new(severity.as_str()).fg(Color::Red),
        Severity::High => Cell::new(severity.as_str()).fg(Color::Yellow),
        Severity::Medium | Severity::Low => Cell::new(severity.as_str()),
    }
}

fn failures_cell(failures: Option<u64>) -> Cell {
    match failures {
        Some(n) => Cell::new(n),
        None => Cell::new("-").add_attribute(Attribute::Dim),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::error::CheckError;
    use crate::domain::quality::QualityCheck;

    fn results() -> Vec<CheckResult> {
        let dup = QualityCheck::new("cliente_duplicate_id", "", Severity::Critical, "");
        let orphans = QualityCheck::new("projeto_orphan_cliente", "", Severity::High, "");
        let broken = QualityCheck::new("broken", "", Severity::Low, "");
        vec![
            CheckResult::counted(&dup, 0, None),
            CheckResult::counted(&orphans, 2, Some("99".into())),
            CheckResult::errored(
                &broken,
                &CheckError::ProtocolViolation("query did not return any rows".into()),
            ),
        ]
    }

    #[test]
    fn test_table_shows_every_result() {
        let table = render_table(&results());
        assert!(table.contains("cliente_duplicate_id"));
        assert!(table.contains("PASS"));
        assert!(table.contains("FAIL"));
        assert!(table.contains("ERROR"));
        assert!(table.contains("99"));
        assert!(table.contains("query did not return any rows"));
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            summary_line(&results()),
            "3 checks: 1 passed, 1 failed, 1 errored"
        );
    }

    #[test]
    fn test_json_report_reads_back() -> anyhow::Result<()> {
        let json = to_json(&results())?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(value.as_array().unwrap().len(), 3);
        assert_eq!(value[1]["status"], "FAIL");
        assert_eq!(value[1]["failures"], 2);
        assert_eq!(value[1]["sample"], "99");
        assert!(value[2]["failures"].is_null());

        assert_eq!(from_json(&json)?, results());
        Ok(())
    }
}
