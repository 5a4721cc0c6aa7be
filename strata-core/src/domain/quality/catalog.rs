// strata-core/src/domain/quality/catalog.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use crate::domain::error::DomainError;
use crate::domain::quality::check::{QualityCheck, Severity};
use crate::domain::quality::rule::RuleShape;

/// A check as declared in the catalog file, before compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CheckDeclaration {
    #[validate(length(min = 1, message = "check name cannot be empty"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    pub rule: RuleShape,
}

/// Ordered, name-unique set of compiled checks. Execution order is declaration order.
#[derive(Debug, Clone, Default)]
pub struct QualityCatalog {
    checks: Vec<QualityCheck>,
}

impl QualityCatalog {
    pub fn compile(declarations: Vec<CheckDeclaration>) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        let mut checks = Vec::with_capacity(declarations.len());

        for decl in declarations {
            decl.validate()
                .map_err(|e| DomainError::InvalidCatalog(e.to_string()))?;

            if !seen.insert(decl.name.clone()) {
                return Err(DomainError::InvalidCatalog(format!(
                    "duplicate check name '{}'",
                    decl.name
                )));
            }

            let template = decl.rule.compile().map_err(|e| match e {
                DomainError::InvalidCatalog(msg) => {
                    DomainError::InvalidCatalog(format!("check '{}': {}", decl.name, msg))
                }
                other => other,
            })?;

            checks.push(QualityCheck::new(
                decl.name,
                decl.description,
                decl.severity,
                template,
            ));
        }

        Ok(Self { checks })
    }

    pub fn checks(&self) -> &[QualityCheck] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
