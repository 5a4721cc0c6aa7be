// strata-core/src/infrastructure/normalizers/html.rs

use chrono::{DateTime, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::{malformed, read_text};
use crate::domain::error::MalformedInputError;
use crate::domain::records::{FieldValue, NormalizedOutput, RecordSet};
use crate::ports::normalizer::Normalize;

const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// First `<table>` of the page; the first row is the header row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HtmlTableNormalizer {
    /// Header text -> column name. Every mapped header must be present.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
    /// Columns (after renaming) parsed as timestamps; NULL or unparsable is an error.
    #[serde(default)]
    pub timestamp_columns: Vec<String>,
}

impl HtmlTableNormalizer {
    pub fn parse(&self, text: &str) -> Result<RecordSet, String> {
        let table_sel = selector("table")?;
        let row_sel = selector("tr")?;
        let cell_sel = selector("th, td")?;

        let document = Html::parse_document(text);
        let table = document
            .select(&table_sel)
            .next()
            .ok_or_else(|| "no <table> found".to_string())?;

        let mut rows = table
            .select(&row_sel)
            .map(|tr| tr.select(&cell_sel).map(cell_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty());

        let headers = rows
            .next()
            .ok_or_else(|| "table has no header row".to_string())?;

        let columns: Vec<String> = headers
            .iter()
            .map(|h| self.columns.get(h).cloned().unwrap_or_else(|| h.clone()))
            .collect();

        let mut missing: Vec<&str> = self
            .columns
            .iter()
            .filter(|(header, _)| !headers.contains(header))
            .map(|(_, column)| column.as_str())
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(format!("missing columns: {}", missing.join(", ")));
        }

        let mut set = RecordSet::new(columns);
        let ts_idx = self
            .timestamp_columns
            .iter()
            .map(|c| {
                set.column_index(c)
                    .ok_or_else(|| format!("missing column '{}'", c))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (line, cells) in rows.enumerate() {
            let mut values: Vec<FieldValue> =
                cells.iter().map(|c| FieldValue::text_or_null(c)).collect();

            for &idx in &ts_idx {
                let parsed = match values.get(idx) {
                    Some(FieldValue::Text(raw)) => parse_timestamp(raw),
                    _ => None,
                };
                let ts = parsed.ok_or_else(|| {
                    format!(
                        "row {}: invalid value in timestamp column '{}'",
                        line + 1,
                        set.columns()[idx]
                    )
                })?;
                values[idx] = FieldValue::Timestamp(ts);
            }

            set.push_row(values)?;
        }

        Ok(set)
    }
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("bad selector '{}': {}", css, e))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

impl Normalize for HtmlTableNormalizer {
    fn kind(&self) -> &'static str {
        "html_table"
    }

    fn read(&self, locator: &Path) -> Result<NormalizedOutput, MalformedInputError> {
        let text = read_text(locator)?;
        self.parse(&text)
            .map(NormalizedOutput::Single)
            .map_err(|cause| malformed(locator, cause))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <h1>Logs</h1>
  <table>
    <tr><th>ID Log</th><th>Timestamp</th><th>Usuário</th></tr>
    <tr><td>1</td><td>2024-05-02 13:45:10</td><td>ana</td></tr>
    <tr><td>2</td><td>2024-05-02T14:00:00Z</td><td></td></tr>
  </table>
  <table><tr><th>ignored</th></tr></table>
</body></html>"#;

    fn normalizer() -> HtmlTableNormalizer {
        HtmlTableNormalizer {
            columns: BTreeMap::from([
                ("ID Log".to_string(), "id_log".to_string()),
                ("Timestamp".to_string(), "log_time".to_string()),
                ("Usuário".to_string(), "usuario".to_string()),
            ]),
            timestamp_columns: vec!["log_time".into()],
        }
    }

    #[test]
    fn test_first_table_renamed_and_typed() {
        let set = normalizer().parse(PAGE).unwrap();
        assert_eq!(set.columns(), ["id_log", "log_time", "usuario"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.value(0, "id_log"), Some(&FieldValue::Text("1".into())));
        assert_eq!(
            set.value(0, "log_time"),
            Some(&FieldValue::Timestamp(
                NaiveDateTime::parse_from_str("2024-05-02 13:45:10", "%Y-%m-%d %H:%M:%S").unwrap()
            ))
        );
        assert_eq!(set.value(1, "usuario"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_missing_mapped_header_is_rejected() {
        let mut n = normalizer();
        n.columns.insert("IP".into(), "ip".into());
        let err = n.parse(PAGE).unwrap_err();
        assert_eq!(err, "missing columns: ip");
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let page = "<table><tr><th>Timestamp</th></tr><tr><td>soon</td></tr></table>";
        let n = HtmlTableNormalizer {
            columns: BTreeMap::from([("Timestamp".to_string(), "log_time".to_string())]),
            timestamp_columns: vec!["log_time".into()],
        };
        let err = n.parse(page).unwrap_err();
        assert!(err.contains("timestamp column 'log_time'"));
    }

    #[test]
    fn test_page_without_table_is_rejected() {
        let err = HtmlTableNormalizer::default()
            .parse("<html><p>nothing</p></html>")
            .unwrap_err();
        assert_eq!(err, "no <table> found");
    }
}
