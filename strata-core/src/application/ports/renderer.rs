// strata-core/src/application/ports/renderer.rs

use crate::domain::table::TableBinding;
use crate::error::StrataError;

/// Turns a check's query template into executable SQL for one binding.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, StrataError>;

    /// Render context for a binding: `project` and `dataset` are visible to templates.
    fn context(&self, binding: &TableBinding) -> serde_json::Value {
        serde_json::json!({
            "project": binding.project,
            "dataset": binding.dataset,
        })
    }
}
