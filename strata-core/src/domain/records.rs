// strata-core/src/domain/records.rs

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// One cell of a tabular record set. No schema inference happens here:
/// normalizers only produce typed values where the source is explicit.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Empty strings become NULL, everything else is kept verbatim.
    pub fn text_or_null(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Null
        } else {
            Self::Text(raw.to_string())
        }
    }

    /// Integral value, if it is one. Floats must be whole and fit in an i64.
    pub fn as_i64(&self) -> Option<i64> {
        // 2^63, exactly representable
        const BOUND: f64 = 9_223_372_036_854_775_808.0;
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 && *v >= -BOUND && *v < BOUND => Some(*v as i64),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A named-column table held in memory. Every row has exactly one value per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a record set, rejecting rows whose width differs from the header.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<FieldValue>>) -> Result<Self, String> {
        let mut set = Self::new(columns);
        for row in rows {
            set.push_row(row)?;
        }
        Ok(set)
    }

    pub fn push_row(&mut self, row: Vec<FieldValue>) -> Result<(), String> {
        if row.len() != self.columns.len() {
            return Err(format!(
                "row {} has {} values, expected {}",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&FieldValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Keeps only the rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[FieldValue]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }
}

/// What a normalizer hands back: one record set, or several for documents
/// that fan out (e.g. projects and their tasks).
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedOutput {
    Single(RecordSet),
    FanOut(Vec<(String, RecordSet)>),
}

impl NormalizedOutput {
    pub fn total_rows(&self) -> usize {
        match self {
            Self::Single(set) => set.len(),
            Self::FanOut(sets) => sets.iter().map(|(_, s)| s.len()).sum(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_rejects_ragged_rows() {
        let mut set = RecordSet::new(vec!["id".into(), "name".into()]);
        assert!(set.push_row(vec![FieldValue::Int(1), FieldValue::Null]).is_ok());
        let err = set.push_row(vec![FieldValue::Int(2)]).unwrap_err();
        assert!(err.contains("row 2 has 1 values, expected 2"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_value_lookup_is_case_insensitive() {
        let set = RecordSet::from_rows(
            vec!["ID_Cliente".into()],
            vec![vec![FieldValue::Text("42".into())]],
        )
        .unwrap();
        assert_eq!(set.value(0, "id_cliente"), Some(&FieldValue::Text("42".into())));
        assert_eq!(set.value(1, "id_cliente"), None);
    }

    #[test]
    fn test_as_i64_rejects_lossy_floats() {
        assert_eq!(FieldValue::Float(3.0).as_i64(), Some(3));
        assert_eq!(FieldValue::Float(-2.0).as_i64(), Some(-2));
        assert_eq!(FieldValue::Float(2.5).as_i64(), None);
        assert_eq!(FieldValue::Float(1e20).as_i64(), None);
        assert_eq!(FieldValue::Float(f64::NAN).as_i64(), None);
        assert_eq!(FieldValue::Float(f64::INFINITY).as_i64(), None);
        assert_eq!(FieldValue::Text("3".into()).as_i64(), None);
    }

    #[test]
    fn test_text_or_null() {
        assert_eq!(FieldValue::text_or_null(""), FieldValue::Null);
        assert_eq!(FieldValue::text_or_null("x"), FieldValue::Text("x".into()));
    }

    #[test]
    fn test_fan_out_totals() {
        let parents = RecordSet::from_rows(vec!["id".into()], vec![vec![FieldValue::Int(1)]]).unwrap();
        let children = RecordSet::from_rows(
            vec!["id".into()],
            vec![vec![FieldValue::Int(1)], vec![FieldValue::Int(2)]],
        )
        .unwrap();
        let output = NormalizedOutput::FanOut(vec![
            ("projects".into(), parents),
            ("tasks".into(), children),
        ]);
        assert_eq!(output.total_rows(), 3);
    }
}
