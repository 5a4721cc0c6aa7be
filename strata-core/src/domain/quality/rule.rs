// strata-core/src/domain/quality/rule.rs

// The four recurring validation shapes (plus an escape hatch). Each shape
// compiles into a query template that returns exactly one row:
// (failures BIGINT, sample VARCHAR). Tables are referenced through
// `{{ table('name') }}` so the same catalog runs against any project/dataset.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::domain::error::DomainError;
use crate::domain::quality::check::{SAMPLE_LIMIT, SAMPLE_SEPARATOR};

fn re_identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

fn re_table() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*\.)?[A-Za-z_][A-Za-z0-9_]*$")
            .unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RuleShape {
    FieldValidity(FieldValidityRule),
    Uniqueness(UniquenessRule),
    ReferentialIntegrity(ReferentialRule),
    CrossField(CrossFieldRule),
    Custom(CustomRule),
}

impl RuleShape {
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::FieldValidity(_) => "field_validity",
            Self::Uniqueness(_) => "uniqueness",
            Self::ReferentialIntegrity(_) => "referential_integrity",
            Self::CrossField(_) => "cross_field",
            Self::Custom(_) => "custom",
        }
    }

    /// Produces the query template for this rule.
    pub fn compile(&self) -> Result<String, DomainError> {
        match self {
            Self::FieldValidity(rule) => rule.compile(),
            Self::Uniqueness(rule) => rule.compile(),
            Self::ReferentialIntegrity(rule) => rule.compile(),
            Self::CrossField(rule) => rule.compile(),
            Self::Custom(rule) => rule.compile(),
        }
    }
}

// --- FIELD VALIDITY ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidityRule {
    pub table: String,
    /// Column reported in the sample for failing rows.
    pub key: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub formats: Vec<FormatRule>,
    #[serde(default)]
    pub ranges: Vec<RangeRule>,
    #[serde(default)]
    pub allowed_values: Vec<AllowedValuesRule>,
    #[serde(default)]
    pub dependent_ranges: Vec<DependentRangeRule>,
    #[serde(default)]
    pub not_in_future: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatRule {
    pub column: String,
    /// Whole-value regular expression.
    pub pattern: Option<String>,
    /// Exact character length.
    pub length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    pub column: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowedValuesRule {
    pub column: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub case_insensitive: bool,
}

/// The valid range of `target` depends on the category held in `selector`.
/// A category mapped to `null` accepts any target value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependentRangeRule {
    pub selector: String,
    pub target: String,
    pub ranges: BTreeMap<String, Option<Bounds>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl FieldValidityRule {
    /// One SQL predicate per violation; a row fails when any of them holds.
    pub fn predicates(&self) -> Result<Vec<String>, DomainError> {
        let mut predicates = Vec::new();

        for column in &self.required {
            predicates.push(format!("{} IS NULL", ident(column)?));
        }

        for format in &self.formats {
            let col = ident(&format.column)?;
            if format.pattern.is_none() && format.length.is_none() {
                return Err(DomainError::InvalidCatalog(format!(
                    "format rule on '{}' needs a pattern or a length",
                    format.column
                )));
            }
            if let Some(pattern) = &format.pattern {
                Regex::new(pattern).map_err(|e| {
                    DomainError::InvalidCatalog(format!("bad pattern on '{}': {}", format.column, e))
                })?;
                predicates.push(format!(
                    "NOT regexp_full_match(CAST({} AS VARCHAR), {})",
                    col,
                    literal(pattern)
                ));
            }
            if let Some(length) = format.length {
                predicates.push(format!("length(CAST({} AS VARCHAR)) <> {}", col, length));
            }
        }

        for range in &self.ranges {
            let col = ident(&range.column)?;
            if range.min.is_none() && range.max.is_none() {
                return Err(DomainError::InvalidCatalog(format!(
                    "range rule on '{}' needs a min or a max",
                    range.column
                )));
            }
            let (below, above) = if range.exclusive { ("<=", ">=") } else { ("<", ">") };
            if let Some(min) = range.min {
                predicates.push(format!("{} {} {}", col, below, number(min)?));
            }
            if let Some(max) = range.max {
                predicates.push(format!("{} {} {}", col, above, number(max)?));
            }
        }

        for allowed in &self.allowed_values {
            if allowed.values.is_empty() {
                return Err(DomainError::InvalidCatalog(format!(
                    "allowed_values on '{}' is empty",
                    allowed.column
                )));
            }
            let col = ident(&allowed.column)?;
            let (subject, values): (String, Vec<String>) = if allowed.case_insensitive {
                (
                    format!("upper({})", col),
                    allowed.values.iter().map(|v| literal(&v.to_uppercase())).collect(),
                )
            } else {
                (col, allowed.values.iter().map(|v| literal(v)).collect())
            };
            predicates.push(format!("{} NOT IN ({})", subject, values.join(", ")));
        }

        for dependent in &self.dependent_ranges {
            predicates.extend(dependent.predicates()?);
        }

        for column in &self.not_in_future {
            predicates.push(format!("{} > CURRENT_DATE", ident(column)?));
        }

        if predicates.is_empty() {
            return Err(DomainError::InvalidCatalog(format!(
                "field_validity rule on '{}' declares no predicates",
                self.table
            )));
        }
        Ok(predicates)
    }

    fn compile(&self) -> Result<String, DomainError> {
        let predicates = self.predicates()?;
        let failing = format!(
            "    SELECT CAST({key} AS VARCHAR) AS failing_key\n    FROM {table}\n    WHERE {filter}",
            key = ident(&self.key)?,
            table = table(&self.table)?,
            filter = predicates.join("\n       OR "),
        );
        Ok(failure_query(&failing, false))
    }
}

impl DependentRangeRule {
    fn predicates(&self) -> Result<Vec<String>, DomainError> {
        if self.ranges.is_empty() {
            return Err(DomainError::InvalidCatalog(format!(
                "dependent range on '{}' declares no categories",
                self.selector
            )));
        }
        let selector = ident(&self.selector)?;
        let target = ident(&self.target)?;
        let categories: Vec<String> = self.ranges.keys().map(|k| literal(k)).collect();

        let mut predicates = vec![
            format!("{} IS NULL", selector),
            format!("{} NOT IN ({})", selector, categories.join(", ")),
        ];
        for (category, bounds) in &self.ranges {
            if let Some(bounds) = bounds {
                if bounds.min > bounds.max {
                    return Err(DomainError::InvalidCatalog(format!(
                        "range for '{}' = '{}' has min > max",
                        self.selector, category
                    )));
                }
                predicates.push(format!(
                    "({sel} = {cat} AND ({tgt} IS NULL OR {tgt} NOT BETWEEN {min} AND {max}))",
                    sel = selector,
                    cat = literal(category),
                    tgt = target,
                    min = number(bounds.min)?,
                    max = number(bounds.max)?,
                ));
            }
        }
        Ok(predicates)
    }
}

// --- UNIQUENESS ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniquenessRule {
    pub table: String,
    /// Natural or composite key.
    pub columns: Vec<String>,
    /// Skip rows where any key column is NULL.
    #[serde(default)]
    pub ignore_nulls: bool,
}

impl UniquenessRule {
    fn compile(&self) -> Result<String, DomainError> {
        if self.columns.is_empty() {
            return Err(DomainError::InvalidCatalog(format!(
                "uniqueness rule on '{}' declares no columns",
                self.table
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| ident(c))
            .collect::<Result<Vec<_>, _>>()?;

        let key = columns
            .iter()
            .map(|c| format!("CAST({} AS VARCHAR)", c))
            .collect::<Vec<_>>()
            .join(" || '|' || ");

        let filter = if self.ignore_nulls {
            let not_null = columns
                .iter()
                .map(|c| format!("{} IS NOT NULL", c))
                .collect::<Vec<_>>()
                .join(" AND ");
            format!("\n    WHERE {}", not_null)
        } else {
            String::new()
        };

        let failing = format!(
            "    SELECT {key} AS failing_key\n    FROM {table}{filter}\n    GROUP BY {group}\n    HAVING COUNT(*) > 1",
            key = key,
            table = table(&self.table)?,
            filter = filter,
            group = columns.join(", "),
        );
        Ok(failure_query(&failing, false))
    }
}

// --- REFERENTIAL INTEGRITY ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferentialRule {
    pub table: String,
    pub column: String,
    pub parent_table: String,
    pub parent_column: String,
}

impl ReferentialRule {
    fn compile(&self) -> Result<String, DomainError> {
        let child_col = ident(&self.column)?;
        let parent_col = ident(&self.parent_column)?;
        let failing = format!(
            "    SELECT CAST(child.{c} AS VARCHAR) AS failing_key\n    FROM {child} AS child\n    LEFT JOIN {parent} AS parent\n      ON child.{c} = parent.{p}\n    WHERE parent.{p} IS NULL",
            c = child_col,
            p = parent_col,
            child = table(&self.table)?,
            parent = table(&self.parent_table)?,
        );
        Ok(failure_query(&failing, true))
    }
}

// --- CROSS-FIELD CONSISTENCY ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossFieldRule {
    pub table: String,
    pub key: String,
    pub comparisons: Vec<Comparison>,
}

/// `left op right` must hold on every row; NULL operands are left to field validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub left: String,
    pub op: ComparisonOp,
    pub right: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Le,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Ge,
    #[serde(alias = "=")]
    Eq,
    #[serde(alias = "!=", alias = "<>")]
    Ne,
}

impl ComparisonOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
            Self::Ne => "<>",
        }
    }
}

impl CrossFieldRule {
    fn compile(&self) -> Result<String, DomainError> {
        if self.comparisons.is_empty() {
            return Err(DomainError::InvalidCatalog(format!(
                "cross_field rule on '{}' declares no comparisons",
                self.table
            )));
        }
        let mut predicates = Vec::with_capacity(self.comparisons.len());
        for cmp in &self.comparisons {
            predicates.push(format!(
                "NOT ({} {} {})",
                ident(&cmp.left)?,
                cmp.op.as_sql(),
                ident(&cmp.right)?
            ));
        }
        let failing = format!(
            "    SELECT CAST({key} AS VARCHAR) AS failing_key\n    FROM {table}\n    WHERE {filter}",
            key = ident(&self.key)?,
            table = table(&self.table)?,
            filter = predicates.join("\n       OR "),
        );
        Ok(failure_query(&failing, false))
    }
}

// --- CUSTOM ---

/// Hand-written template. Must still return one (failures, sample) row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRule {
    pub query: String,
}

impl CustomRule {
    fn compile(&self) -> Result<String, DomainError> {
        if self.query.trim().is_empty() {
            return Err(DomainError::InvalidCatalog("custom rule has an empty query".into()));
        }
        Ok(self.query.trim().to_string())
    }
}

// --- SQL HELPERS ---

fn failure_query(failing: &str, distinct_sample: bool) -> String {
    let distinct = if distinct_sample { "DISTINCT " } else { "" };
    format!(
        "WITH failing AS (\n{failing}\n)\nSELECT\n    (SELECT COUNT(*) FROM failing) AS failures,\n    (SELECT string_agg(failing_key, chr({separator}) ORDER BY failing_key)\n       FROM (SELECT {distinct}failing_key\n               FROM failing\n              WHERE failing_key IS NOT NULL\n              ORDER BY failing_key\n              LIMIT {limit}) AS sampled) AS sample",
        failing = failing,
        distinct = distinct,
        limit = SAMPLE_LIMIT,
        separator = u32::from(SAMPLE_SEPARATOR),
    )
}

fn ident(name: &str) -> Result<String, DomainError> {
    if !re_identifier().is_match(name) {
        return Err(DomainError::InvalidCatalog(format!(
            "'{}' is not a valid column name",
            name
        )));
    }
    Ok(format!("\"{}\"", name))
}

fn table(name: &str) -> Result<String, DomainError> {
    if !re_table().is_match(name) {
        return Err(DomainError::InvalidCatalog(format!(
            "'{}' is not a valid table name",
            name
        )));
    }
    Ok(format!("{{{{ table('{}') }}}}", name))
}

// Literals end up inside a Jinja template: anything that could open a tag is kept raw.
fn literal(value: &str) -> String {
    let quoted = format!("'{}'", value.replace('\'', "''"));
    if value.contains('{') || value.contains('}') {
        format!("{{% raw %}}{}{{% endraw %}}", quoted)
    } else {
        quoted
    }
}

fn number(value: f64) -> Result<String, DomainError> {
    if !value.is_finite() {
        return Err(DomainError::InvalidCatalog(format!(
            "bound {} is not a finite number",
            value
        )));
    }
    Ok(format!("{}", value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn validity(yaml: &str) -> FieldValidityRule {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_required_and_format_predicates() {
        let rule = validity(
            r#"
table: cliente
key: id_cliente
required: [id_cliente, cnpj]
formats:
  - { column: cnpj, pattern: "[0-9]+", length: 14 }
"#,
        );
        let predicates = rule.predicates().unwrap();
        assert_eq!(predicates.len(), 4);
        insta::assert_snapshot!(predicates.join(" | "), @r#""id_cliente" IS NULL | "cnpj" IS NULL | NOT regexp_full_match(CAST("cnpj" AS VARCHAR), '[0-9]+') | length(CAST("cnpj" AS VARCHAR)) <> 14"#);
    }

    #[test]
    fn test_braces_in_patterns_are_kept_out_of_jinja() {
        let rule = validity(
            r#"
table: cliente
key: id_cliente
formats:
  - { column: cep, pattern: "[0-9]{8}" }
"#,
        );
        let predicates = rule.predicates().unwrap();
        assert!(predicates[0].contains("{% raw %}'[0-9]{8}'{% endraw %}"));
    }

    #[test]
    fn test_dependent_ranges() {
        let rule = validity(
            r#"
table: analise_tributaria
key: id_analise
dependent_ranges:
  - selector: periodo_tipo
    target: periodo_valor
    ranges:
      MES: { min: 1, max: 12 }
      TRIMESTRE: { min: 1, max: 4 }
      DESCONHECIDO: null
"#,
        );
        let predicates = rule.predicates().unwrap();
        assert_eq!(predicates.len(), 4);
        assert_eq!(
            predicates[1],
            r#""periodo_tipo" NOT IN ('DESCONHECIDO', 'MES', 'TRIMESTRE')"#
        );
        insta::assert_snapshot!(predicates[2], @r#"("periodo_tipo" = 'MES' AND ("periodo_valor" IS NULL OR "periodo_valor" NOT BETWEEN 1 AND 12))"#);
    }

    #[test]
    fn test_ranges_and_allowed_values() {
        let rule = validity(
            r#"
table: nota_fiscal_item
key: id_item
ranges:
  - { column: quantidade, min: 0, exclusive: true }
  - { column: valor_unitario, min: 0 }
allowed_values:
  - { column: tipo_imposto, values: [iss, pis], case_insensitive: true }
"#,
        );
        let predicates = rule.predicates().unwrap();
        assert_eq!(predicates[0], r#""quantidade" <= 0"#);
        assert_eq!(predicates[1], r#""valor_unitario" < 0"#);
        assert_eq!(predicates[2], r#"upper("tipo_imposto") NOT IN ('ISS', 'PIS')"#);
    }

    #[test]
    fn test_invalid_identifiers_are_rejected() {
        let rule = validity(
            r#"
table: cliente
key: "id; DROP TABLE cliente"
required: [id_cliente]
"#,
        );
        assert!(rule.compile().is_err());

        let empty = validity("table: cliente\nkey: id_cliente\n");
        assert!(empty.compile().is_err());
    }

    #[test]
    fn test_uniqueness_composite_key() {
        let shape: RuleShape = serde_yaml::from_str(
            r#"
shape: uniqueness
table: nota_fiscal
columns: [numero_nota, id_cliente]
ignore_nulls: true
"#,
        )
        .unwrap();
        let sql = shape.compile().unwrap();
        assert!(sql.contains(r#"CAST("numero_nota" AS VARCHAR) || '|' || CAST("id_cliente" AS VARCHAR)"#));
        assert!(sql.contains(r#"WHERE "numero_nota" IS NOT NULL AND "id_cliente" IS NOT NULL"#));
        assert!(sql.contains("HAVING COUNT(*) > 1"));
        assert!(sql.contains("{{ table('nota_fiscal') }}"));
    }

    #[test]
    fn test_referential_uses_distinct_sample() {
        let shape: RuleShape = serde_yaml::from_str(
            r#"
shape: referential_integrity
table: tarefa
column: id_projeto
parent_table: projeto
parent_column: id_projeto
"#,
        )
        .unwrap();
        let sql = shape.compile().unwrap();
        assert!(sql.contains("LEFT JOIN {{ table('projeto') }} AS parent"));
        assert!(sql.contains(r#"WHERE parent."id_projeto" IS NULL"#));
        assert!(sql.contains("SELECT DISTINCT failing_key"));
        assert_eq!(shape.shape_name(), "referential_integrity");
    }

    #[test]
    fn test_cross_field_accepts_symbolic_operators() {
        let shape: RuleShape = serde_yaml::from_str(
            r#"
shape: cross_field
table: projeto
key: id_projeto
comparisons:
  - { left: data_inicio, op: "<=", right: data_prevista_fim }
  - { left: valor_total, op: ge, right: valor_servico }
"#,
        )
        .unwrap();
        let sql = shape.compile().unwrap();
        assert!(sql.contains(r#"NOT ("data_inicio" <= "data_prevista_fim")"#));
        assert!(sql.contains(r#"OR NOT ("valor_total" >= "valor_servico")"#));
    }

    #[test]
    fn test_custom_rule_must_not_be_empty() {
        let rule = CustomRule { query: "   ".into() };
        assert!(rule.compile().is_err());
    }
}
