// strata-core/src/infrastructure/normalizers/raw.rs

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{DEFAULT_DOCUMENT_COLUMN, read_text};
use crate::domain::error::MalformedInputError;
use crate::domain::records::{FieldValue, NormalizedOutput, RecordSet};
use crate::ports::normalizer::Normalize;

/// Lands the whole file, untouched, as a single one-column row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocumentNormalizer {
    #[serde(default = "default_column")]
    pub column: String,
}

fn default_column() -> String {
    DEFAULT_DOCUMENT_COLUMN.to_string()
}

impl Default for RawDocumentNormalizer {
    fn default() -> Self {
        Self {
            column: default_column(),
        }
    }
}

impl Normalize for RawDocumentNormalizer {
    fn kind(&self) -> &'static str {
        "raw_document"
    }

    fn read(&self, locator: &Path) -> Result<NormalizedOutput, MalformedInputError> {
        let text = read_text(locator)?;
        let mut set = RecordSet::new(vec![self.column.clone()]);
        set.push_row(vec![FieldValue::Text(text)])
            .map_err(|cause| super::malformed(locator, cause))?;
        Ok(NormalizedOutput::Single(set))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_whole_file_becomes_one_row() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("tarefas_projetos.json");
        let body = "[{\"id_projeto\": 1}]\n";
        fs::write(&path, body)?;

        let output = RawDocumentNormalizer::default().read(&path)?;
        let NormalizedOutput::Single(set) = output else {
            panic!("expected a single record set");
        };
        assert_eq!(set.columns(), ["conteudo"]);
        assert_eq!(set.value(0, "conteudo"), Some(&FieldValue::Text(body.into())));
        Ok(())
    }
}
