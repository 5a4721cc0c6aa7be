// strata-core/src/infrastructure/normalizers/json.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

use super::{malformed, read_text};
use crate::domain::error::MalformedInputError;
use crate::domain::records::{FieldValue, NormalizedOutput, RecordSet};
use crate::ports::normalizer::Normalize;

/// Splits a "children within parents" document into two record sets joined
/// by a foreign key copied down from each parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedJsonNormalizer {
    /// Dot path to the parent array; the document root when absent.
    #[serde(default)]
    pub records_path: Option<String>,
    /// Field of each parent holding the child array.
    pub children: String,
    pub parent_key: String,
    /// Column name of the key on child rows; defaults to `parent_key`.
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub parent_set: Option<String>,
    #[serde(default)]
    pub child_set: Option<String>,
}

impl NestedJsonNormalizer {
    pub fn parent_set_name(&self) -> &str {
        self.parent_set.as_deref().unwrap_or("parents")
    }

    pub fn child_set_name(&self) -> &str {
        self.child_set.as_deref().unwrap_or(&self.children)
    }

    pub fn parse(&self, text: &str) -> Result<Vec<(String, RecordSet)>, String> {
        let document: Value =
            serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?;

        let mut node = &document;
        if let Some(path) = &self.records_path {
            for segment in path.split('.').filter(|s| !s.is_empty()) {
                node = node
                    .get(segment)
                    .ok_or_else(|| format!("path '{}' not found (at '{}')", path, segment))?;
            }
        }
        let parents = node
            .as_array()
            .ok_or_else(|| "parent records must be a JSON array".to_string())?;

        let foreign_key = self.foreign_key.as_deref().unwrap_or(&self.parent_key);
        let mut parent_rows: Vec<Map<String, Value>> = Vec::with_capacity(parents.len());
        let mut child_rows: Vec<Map<String, Value>> = Vec::new();

        for (i, parent) in parents.iter().enumerate() {
            let mut fields = parent
                .as_object()
                .cloned()
                .ok_or_else(|| format!("parent record {} is not an object", i + 1))?;

            let key = fields
                .get(&self.parent_key)
                .filter(|v| !v.is_null())
                .cloned()
                .ok_or_else(|| {
                    format!("parent record {} has no '{}'", i + 1, self.parent_key)
                })?;

            match fields.remove(&self.children) {
                None | Some(Value::Null) => {}
                Some(Value::Array(items)) => {
                    for (j, item) in items.into_iter().enumerate() {
                        let mut child = match item {
                            Value::Object(map) => map,
                            _ => {
                                return Err(format!(
                                    "child {} of parent record {} is not an object",
                                    j + 1,
                                    i + 1
                                ));
                            }
                        };
                        match child.get(foreign_key) {
                            Some(own) if !own.is_null() && *own != key => {
                                return Err(format!(
                                    "child {} of parent record {} has '{}' = {}, parent key is {}",
                                    j + 1,
                                    i + 1,
                                    foreign_key,
                                    own,
                                    key
                                ));
                            }
                            _ => {
                                child.insert(foreign_key.to_string(), key.clone());
                            }
                        }
                        child_rows.push(child);
                    }
                }
                Some(_) => {
                    return Err(format!(
                        "'{}' of parent record {} is not an array",
                        self.children,
                        i + 1
                    ));
                }
            }

            parent_rows.push(fields);
        }

        Ok(vec![
            (self.parent_set_name().to_string(), tabulate(&parent_rows)?),
            (self.child_set_name().to_string(), tabulate(&child_rows)?),
        ])
    }
}

// Columns are the sorted union of keys; absent keys become NULL.
fn tabulate(rows: &[Map<String, Value>]) -> Result<RecordSet, String> {
    let columns: BTreeSet<&String> = rows.iter().flat_map(|r| r.keys()).collect();
    let columns: Vec<String> = columns.into_iter().cloned().collect();

    let mut set = RecordSet::new(columns.clone());
    for row in rows {
        let values = columns
            .iter()
            .map(|c| row.get(c).map(scalar).unwrap_or(FieldValue::Null))
            .collect();
        set.push_row(values)?;
    }
    Ok(set)
}

fn scalar(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => n
                .as_f64()
                .map(FieldValue::Float)
                .unwrap_or_else(|| FieldValue::Text(n.to_string())),
        },
        Value::String(s) => FieldValue::text_or_null(s),
        nested => FieldValue::Text(nested.to_string()),
    }
}

impl Normalize for NestedJsonNormalizer {
    fn kind(&self) -> &'static str {
        "nested_json"
    }

    fn read(&self, locator: &Path) -> Result<NormalizedOutput, MalformedInputError> {
        let text = read_text(locator)?;
        self.parse(&text)
            .map(NormalizedOutput::FanOut)
            .map_err(|cause| malformed(locator, cause))
    }
}
