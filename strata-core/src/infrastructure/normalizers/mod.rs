// strata-core/src/infrastructure/normalizers/mod.rs

// Concrete format adapters behind the `Normalize` port. The project file picks
// one per unit with `normalizer: { format: ..., ... }`.

pub mod delimited;
pub mod html;
pub mod json;
pub mod raw;
pub mod xml;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::domain::error::MalformedInputError;
use crate::domain::records::NormalizedOutput;
use crate::ports::normalizer::Normalize;

pub use delimited::DelimitedNormalizer;
pub use html::HtmlTableNormalizer;
pub use json::NestedJsonNormalizer;
pub use raw::RawDocumentNormalizer;
pub use xml::XmlDocumentNormalizer;

/// Column used by the single-column landing formats.
pub const DEFAULT_DOCUMENT_COLUMN: &str = "conteudo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum Normalizer {
    Delimited(DelimitedNormalizer),
    RawDocument(RawDocumentNormalizer),
    XmlDocument(XmlDocumentNormalizer),
    NestedJson(NestedJsonNormalizer),
    HtmlTable(HtmlTableNormalizer),
}

impl Normalizer {
    /// Ledger operation name used when a unit does not declare one,
    /// e.g. `load_raw_csv` or `load_formatted_xml`.
    pub fn default_operation(&self, source: &Path) -> String {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_else(|| self.kind().to_string());
        match self {
            Self::Delimited(_) | Self::RawDocument(_) => format!("load_raw_{}", ext),
            Self::XmlDocument(_) => "load_formatted_xml".to_string(),
            Self::NestedJson(_) => "load_formatted_json".to_string(),
            Self::HtmlTable(_) => "load_formatted_html".to_string(),
        }
    }
}

impl Normalize for Normalizer {
    fn kind(&self) -> &'static str {
        match self {
            Self::Delimited(n) => n.kind(),
            Self::RawDocument(n) => n.kind(),
            Self::XmlDocument(n) => n.kind(),
            Self::NestedJson(n) => n.kind(),
            Self::HtmlTable(n) => n.kind(),
        }
    }

    fn read(&self, locator: &Path) -> Result<NormalizedOutput, MalformedInputError> {
        match self {
            Self::Delimited(n) => n.read(locator),
            Self::RawDocument(n) => n.read(locator),
            Self::XmlDocument(n) => n.read(locator),
            Self::NestedJson(n) => n.read(locator),
            Self::HtmlTable(n) => n.read(locator),
        }
    }
}

// Shared by every adapter: whole-file UTF-8 read, failures reported against the locator.
pub(crate) fn read_text(locator: &Path) -> Result<String, MalformedInputError> {
    let bytes = fs::read(locator).map_err(|e| {
        MalformedInputError::new(locator.display().to_string(), format!("cannot read file: {}", e))
    })?;
    let text = String::from_utf8(bytes).map_err(|e| {
        MalformedInputError::new(locator.display().to_string(), format!("not valid UTF-8: {}", e))
    })?;
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

pub(crate) fn malformed(locator: &Path, cause: impl Into<String>) -> MalformedInputError {
    MalformedInputError::new(locator.display().to_string(), cause)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tag_selects_adapter() {
        let n: Normalizer = serde_yaml::from_str("format: delimited\ndelimiter: \"|\"\n").unwrap();
        assert_eq!(n.kind(), "delimited");
        assert_eq!(
            n.default_operation(Path::new("data/analises_tributarias.txt")),
            "load_raw_txt"
        );

        let n: Normalizer = serde_yaml::from_str("format: xml_document").unwrap();
        assert_eq!(n.default_operation(Path::new("notas.xml")), "load_formatted_xml");

        let n: Normalizer = serde_yaml::from_str("format: raw_document").unwrap();
        assert_eq!(n.default_operation(Path::new("logs.HTML")), "load_raw_html");
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(serde_yaml::from_str::<Normalizer>("format: parquet").is_err());
    }

    #[test]
    fn test_missing_file_is_malformed_input() {
        let err = read_text(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.locator, "/definitely/not/here.csv");
        assert!(err.cause.starts_with("cannot read file"));
    }
}
