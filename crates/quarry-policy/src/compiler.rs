//! Compile validated requests into parameterized `SELECT` statements.
//!
//! The output template has a fixed shape:
//!
//! ```text
//! SELECT `c1`, `c2` FROM `db`.`table` [WHERE ...] [ORDER BY `c` ASC, ...] LIMIT ?
//! ```
//!
//! Identifiers are charset-checked and backtick-quoted; every caller value,
//! including the limit, is a `?` parameter.

use quarry_core::{GuardrailsConfig, display_identifier, quote_identifier};
use serde::Serialize;
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::ValidationError;
use crate::filter::{Filter, FilterLimits, OrderBy};
use crate::validator::TableRef;

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Convert a JSON scalar. Returns `None` for null, arrays and objects.
    pub fn from_json(value: &Value) -> Option<SqlValue> {
        match value {
            Value::Bool(b) => Some(SqlValue::Bool(*b)),
            Value::String(s) => Some(SqlValue::Text(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(SqlValue::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Some(SqlValue::UInt(u))
                } else {
                    n.as_f64().map(SqlValue::Float)
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Default and ceiling for the row limit.
#[derive(Debug, Clone, Copy)]
pub struct LimitPolicy {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self::from(&GuardrailsConfig::default())
    }
}

impl From<&GuardrailsConfig> for LimitPolicy {
    fn from(config: &GuardrailsConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            max_limit: config.max_limit.min(quarry_core::ABSOLUTE_MAX_LIMIT),
        }
    }
}

impl LimitPolicy {
    /// Resolve a requested limit. Out-of-range values are rejected, never clamped.
    ///
    /// Negative numbers, fractions and integers too wide for `u64` are all
    /// out of range.
    pub fn resolve(&self, requested: Option<&Number>) -> Result<u64, ValidationError> {
        let Some(n) = requested else {
            return Ok(self.default_limit);
        };
        match n.as_u64() {
            Some(limit) if (1..=self.max_limit).contains(&limit) => Ok(limit),
            _ => Err(ValidationError::limit_out_of_range(n, self.max_limit)),
        }
    }
}

/// A single read-only statement ready for execution.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQuery {
    pub database: String,
    pub table: String,
    /// SQL template with `?` placeholders.
    pub sql: String,
    /// Parameters in placeholder order; the limit is last.
    pub params: Vec<SqlValue>,
    /// Selected column names, in output order.
    pub columns: Vec<String>,
    pub limit: u64,
}

#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    limits: LimitPolicy,
    filter_limits: FilterLimits,
}

impl QueryCompiler {
    pub fn new(limits: LimitPolicy) -> Self {
        Self {
            limits,
            filter_limits: FilterLimits::default(),
        }
    }

    pub fn limits(&self) -> &LimitPolicy {
        &self.limits
    }

    pub fn filter_limits(&self) -> &FilterLimits {
        &self.filter_limits
    }

    /// Compile a validated table and column selection.
    ///
    /// `columns` must already have passed [`crate::Whitelist::validate_columns`].
    /// Filter fields are checked against the table's full column list; sort
    /// keys must be among the selected columns.
    pub fn compile(
        &self,
        table_ref: &TableRef,
        columns: &[String],
        filter: Option<&Filter>,
        order_by: &[OrderBy],
        limit: Option<&Number>,
    ) -> Result<CompiledQuery, ValidationError> {
        if columns.is_empty() {
            return Err(ValidationError::no_whitelisted_columns(&table_ref.table));
        }
        let limit = self.limits.resolve(limit)?;

        let projection = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "SELECT {} FROM {}.{}",
            projection,
            quote_identifier(&table_ref.database),
            quote_identifier(&table_ref.table)
        );
        let mut params = Vec::new();

        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            render_filter(filter, table_ref, &mut sql, &mut params)?;
        }

        if !order_by.is_empty() {
            let mut keys = Vec::with_capacity(order_by.len());
            let mut seen: Vec<&str> = Vec::with_capacity(order_by.len());
            for key in order_by {
                if !columns.iter().any(|c| c == &key.column) {
                    return Err(ValidationError::invalid_order_by(format!(
                        "cannot order by '{}': not among the selected columns",
                        display_identifier(&key.column)
                    )));
                }
                if seen.contains(&key.column.as_str()) {
                    return Err(ValidationError::invalid_order_by(format!(
                        "column '{}' appears twice in order_by",
                        key.column
                    )));
                }
                seen.push(&key.column);
                keys.push(format!(
                    "{} {}",
                    quote_identifier(&key.column),
                    key.direction.sql()
                ));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        sql.push_str(" LIMIT ?");
        params.push(SqlValue::UInt(limit));

        debug!(sql = %sql, params = params.len(), "Compiled select");

        Ok(CompiledQuery {
            database: table_ref.database.clone(),
            table: table_ref.table.clone(),
            sql,
            params,
            columns: columns.to_vec(),
            limit,
        })
    }
}

fn render_filter(
    filter: &Filter,
    table_ref: &TableRef,
    sql: &mut String,
    params: &mut Vec<SqlValue>,
) -> Result<(), ValidationError> {
    match filter {
        Filter::Compare { field, op, value } => {
            sql.push_str(&checked_column(field, table_ref)?);
            sql.push(' ');
            sql.push_str(op.sql());
            sql.push_str(" ?");
            params.push(value.clone());
        }
        Filter::In { field, values } => {
            sql.push_str(&checked_column(field, table_ref)?);
            sql.push_str(" IN (");
            sql.push_str(&vec!["?"; values.len()].join(", "));
            sql.push(')');
            params.extend(values.iter().cloned());
        }
        Filter::IsNull { field } => {
            sql.push_str(&checked_column(field, table_ref)?);
            sql.push_str(" IS NULL");
        }
        Filter::IsNotNull { field } => {
            sql.push_str(&checked_column(field, table_ref)?);
            sql.push_str(" IS NOT NULL");
        }
        Filter::All(children) => render_group(children, " AND ", table_ref, sql, params)?,
        Filter::Any(children) => render_group(children, " OR ", table_ref, sql, params)?,
    }
    Ok(())
}

fn render_group(
    children: &[Filter],
    joiner: &str,
    table_ref: &TableRef,
    sql: &mut String,
    params: &mut Vec<SqlValue>,
) -> Result<(), ValidationError> {
    if let [only] = children {
        return render_filter(only, table_ref, sql, params);
    }
    sql.push('(');
    for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
            sql.push_str(joiner);
        }
        render_filter(child, table_ref, sql, params)?;
    }
    sql.push(')');
    Ok(())
}

fn checked_column(field: &str, table_ref: &TableRef) -> Result<String, ValidationError> {
    if table_ref.has_column(field) {
        Ok(quote_identifier(field))
    } else {
        Err(ValidationError::invalid_filter(format!(
            "Unknown column '{}' in filter for table '{}'",
            display_identifier(field),
            table_ref.table
        )))
    }
}
