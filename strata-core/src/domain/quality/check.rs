// strata-core/src/domain/quality/check.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::CheckError;

/// Maximum number of offending keys carried in a result sample.
pub const SAMPLE_LIMIT: usize = 5;

/// Joins sampled keys on the wire (ASCII unit separator), so keys may carry commas.
pub const SAMPLE_SEPARATOR: char = '\u{1f}';

/// Business triage priority. Does not change how a check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[serde(alias = "critical")]
    Critical,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "low")]
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, severity-tagged predicate compiled to a query template.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityCheck {
    name: String,
    description: String,
    severity: Severity,
    query_template: String,
}

impl QualityCheck {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        query_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            severity,
            query_template: query_template.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn query_template(&self) -> &str {
        &self.query_template
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Error,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict of exactly one check execution.
///
/// Only constructible through `counted` / `errored` (or a validated
/// deserialization), so the status always agrees with the failure count:
/// PASS iff 0, FAIL iff > 0, ERROR iff no count was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CheckResultRecord")]
pub struct CheckResult {
    name: String,
    description: String,
    severity: Severity,
    failures: Option<u64>,
    sample: Option<String>,
    status: CheckStatus,
    error: Option<String>,
}

impl CheckResult {
    pub fn counted(check: &QualityCheck, failures: u64, sample: Option<String>) -> Self {
        let status = if failures == 0 {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        };
        Self {
            name: check.name.clone(),
            description: check.description.clone(),
            severity: check.severity,
            failures: Some(failures),
            sample: sample.as_deref().and_then(bound_sample),
            status,
            error: None,
        }
    }

    pub fn errored(check: &QualityCheck, error: &CheckError) -> Self {
        Self {
            name: check.name.clone(),
            description: check.description.clone(),
            severity: check.severity,
            failures: None,
            sample: None,
            status: CheckStatus::Error,
            error: Some(error.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn failures(&self) -> Option<u64> {
        self.failures
    }

    pub fn sample(&self) -> Option<&str> {
        self.sample.as_deref()
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// FAIL and ERROR both fail a validation run.
    pub fn is_problem(&self) -> bool {
        self.status != CheckStatus::Pass
    }
}

/// Keeps at most `SAMPLE_LIMIT` keys, shown comma-separated; blank samples
/// become absent. Text without `SAMPLE_SEPARATOR` is one key.
pub fn bound_sample(raw: &str) -> Option<String> {
    let keys: Vec<&str> = raw
        .split(SAMPLE_SEPARATOR)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .take(SAMPLE_LIMIT)
        .collect();
    if keys.is_empty() {
        None
    } else {
        Some(keys.join(", "))
    }
}

// Wire shape of a result, checked against the status invariant on the way in.
#[derive(Deserialize)]
struct CheckResultRecord {
    name: String,
    #[serde(default)]
    description: String,
    severity: Severity,
    failures: Option<u64>,
    sample: Option<String>,
    status: CheckStatus,
    error: Option<String>,
}

impl TryFrom<CheckResultRecord> for CheckResult {
    type Error = String;

    fn try_from(r: CheckResultRecord) -> Result<Self, Self::Error> {
        let consistent = match r.status {
            CheckStatus::Pass => r.failures == Some(0) && r.error.is_none(),
            CheckStatus::Fail => r.failures.is_some_and(|n| n > 0) && r.error.is_none(),
            CheckStatus::Error => r.failures.is_none() && r.sample.is_none() && r.error.is_some(),
        };
        if !consistent {
            return Err(format!(
                "check result '{}' has status {} inconsistent with failures={:?}, error={:?}",
                r.name, r.status, r.failures, r.error
            ));
        }
        Ok(Self {
            name: r.name,
            description: r.description,
            severity: r.severity,
            failures: r.failures,
            sample: r.sample,
            status: r.status,
            error: r.error,
        })
    }
}
