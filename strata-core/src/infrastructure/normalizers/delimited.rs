// strata-core/src/infrastructure/normalizers/delimited.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{malformed, read_text};
use crate::domain::error::MalformedInputError;
use crate::domain::records::{FieldValue, NormalizedOutput, RecordSet};
use crate::ports::normalizer::Normalize;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// CSV and pipe-delimited text. Cells stay text, empty cells become NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelimitedNormalizer {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub required_columns: Vec<String>,
    /// Rows with a NULL in any of these columns are dropped.
    #[serde(default)]
    pub drop_null_keys: Vec<String>,
    #[serde(default)]
    pub date_columns: Vec<String>,
}

fn default_delimiter() -> char {
    ','
}

impl Default for DelimitedNormalizer {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            required_columns: Vec::new(),
            drop_null_keys: Vec::new(),
            date_columns: Vec::new(),
        }
    }
}

impl DelimitedNormalizer {
    pub fn parse(&self, text: &str) -> Result<RecordSet, String> {
        let delimiter = u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| format!("delimiter '{}' is not a single ASCII byte", self.delimiter))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| format!("cannot read header: {}", e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = RecordSet::new(headers);

        for column in &self.required_columns {
            if records.column_index(column).is_none() {
                return Err(format!("missing required column '{}'", column));
            }
        }

        let date_idx = self.indices(&records, &self.date_columns)?;
        let key_idx = self.indices(&records, &self.drop_null_keys)?;

        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(|e| format!("row {}: {}", line + 1, e))?;
            let mut values: Vec<FieldValue> = row.iter().map(FieldValue::text_or_null).collect();

            for &idx in &date_idx {
                if let FieldValue::Text(raw) = &values[idx] {
                    let date = parse_date(raw).ok_or_else(|| {
                        format!(
                            "row {}: unparsable date '{}' in column '{}'",
                            line + 1,
                            raw,
                            records.columns()[idx]
                        )
                    })?;
                    values[idx] = FieldValue::Date(date);
                }
            }

            records.push_row(values)?;
        }

        if !key_idx.is_empty() {
            records.retain_rows(|row| key_idx.iter().all(|&i| !row[i].is_null()));
        }

        Ok(records)
    }

    fn indices(&self, records: &RecordSet, columns: &[String]) -> Result<Vec<usize>, String> {
        columns
            .iter()
            .map(|c| {
                records
                    .column_index(c)
                    .ok_or_else(|| format!("missing column '{}'", c))
            })
            .collect()
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

impl Normalize for DelimitedNormalizer {
    fn kind(&self) -> &'static str {
        "delimited"
    }

    fn read(&self, locator: &Path) -> Result<NormalizedOutput, MalformedInputError> {
        let text = read_text(locator)?;
        self.parse(&text)
            .map(NormalizedOutput::Single)
            .map_err(|cause| malformed(locator, cause))
    }
}
