// strata-core/src/domain/table.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

/// Fully-qualified destination: `{project}.{dataset}.{table}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

/// The project/dataset pair a run is bound to. Partial identifiers are
/// completed against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBinding {
    pub project: String,
    pub dataset: String,
}

impl TableBinding {
    pub fn new(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
        }
    }

    pub fn table(&self, name: &str) -> TableRef {
        TableRef {
            project: self.project.clone(),
            dataset: self.dataset.clone(),
            table: name.to_string(),
        }
    }

    /// Resolves `table`, `dataset.table` or `project.dataset.table`.
    pub fn resolve(&self, identifier: &str) -> Result<TableRef, DomainError> {
        let parts: Vec<&str> = identifier.split('.').collect();
        if parts.iter().any(|p| !is_valid_part(p)) {
            return Err(DomainError::InvalidTableRef(identifier.to_string()));
        }
        match parts.as_slice() {
            [table] => Ok(self.table(table)),
            [dataset, table] => Ok(TableRef {
                project: self.project.clone(),
                dataset: dataset.to_string(),
                table: table.to_string(),
            }),
            [project, dataset, table] => Ok(TableRef {
                project: project.to_string(),
                dataset: dataset.to_string(),
                table: table.to_string(),
            }),
            _ => Err(DomainError::InvalidTableRef(identifier.to_string())),
        }
    }
}

impl TableRef {
    /// Same dataset, table name suffixed (used for fan-out sets).
    pub fn with_suffix(&self, suffix: &str) -> TableRef {
        TableRef {
            project: self.project.clone(),
            dataset: self.dataset.clone(),
            table: format!("{}_{}", self.table, suffix),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

// Project ids may carry dashes (cloud project naming); datasets and tables may not start with one.
fn is_valid_part(part: &str) -> bool {
    !part.is_empty()
        && !part.starts_with('-')
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn binding() -> TableBinding {
        TableBinding::new("psa-data", "psa_raw")
    }

    #[test]
    fn test_resolve_partial_identifiers() {
        let b = binding();
        assert_eq!(b.resolve("clientes").unwrap().to_string(), "psa-data.psa_raw.clientes");
        assert_eq!(
            b.resolve("staging.clientes").unwrap().to_string(),
            "psa-data.staging.clientes"
        );
        assert_eq!(
            b.resolve("other.psa_raw.clientes").unwrap().to_string(),
            "other.psa_raw.clientes"
        );
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        let b = binding();
        assert!(b.resolve("").is_err());
        assert!(b.resolve("a.b.c.d").is_err());
        assert!(b.resolve("clientes; DROP TABLE x").is_err());
        assert!(b.resolve("psa_raw..clientes").is_err());
    }

    #[test]
    fn test_with_suffix() {
        let t = binding().table("tarefas_projetos");
        assert_eq!(t.with_suffix("tarefas").table, "tarefas_projetos_tarefas");
    }
}
