// strata-core/src/infrastructure/compiler/jinja.rs

// Renders check query templates into SQL the warehouse can run.
// `{{ table('cliente') }}` resolves against the `dataset` of the render context;
// `{{ table('other.cliente') }}` pins the dataset explicitly.

use minijinja::{Environment, Error, ErrorKind, State};

use crate::application::ports::TemplateEngine;
use crate::error::StrataError;
use crate::infrastructure::error::InfrastructureError;

pub struct JinjaRenderer<'a> {
    env: Environment<'a>,
}

impl<'a> JinjaRenderer<'a> {
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_function("table", table_function);

        env.add_filter("upper", |value: &str| Ok(value.to_uppercase()));
        env.add_filter("lower", |value: &str| Ok(value.to_lowercase()));

        Self { env }
    }
}

impl<'a> Default for JinjaRenderer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

fn table_function(state: &State, name: String) -> Result<String, Error> {
    let (dataset, table) = match name.split_once('.') {
        Some((dataset, table)) => (dataset.to_string(), table.to_string()),
        None => {
            let dataset = state
                .lookup("dataset")
                .and_then(|v| v.as_str().map(str::to_string))
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidOperation,
                        format!("table('{}') needs a 'dataset' in the render context", name),
                    )
                })?;
            (dataset, name)
        }
    };
    Ok(format!("{}.{}", quote(&dataset), quote(&table)))
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

impl<'a> TemplateEngine for JinjaRenderer<'a> {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, StrataError> {
        self.env
            .render_str(template, context)
            .map_err(|e| StrataError::Infrastructure(InfrastructureError::TemplateError(e)))
    }
}
