//! Structured read request as received from a caller.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::compiler::{CompiledQuery, QueryCompiler};
use crate::error::ValidationError;
use crate::filter::{Filter, OrderBy};
use crate::validator::Whitelist;

/// Arguments of a `select_rows` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectRequest {
    pub table: String,

    /// Target database. Falls back to the session default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,

    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Number>,
}

impl SelectRequest {
    /// Validate every name against `whitelist` and compile against `db`.
    ///
    /// `db` is the resolved target database; `self.db` is ignored here so
    /// that callers decide how defaults apply.
    pub fn plan(
        &self,
        db: &str,
        whitelist: &Whitelist<'_>,
        compiler: &QueryCompiler,
    ) -> Result<CompiledQuery, ValidationError> {
        let table_ref = whitelist.validate_table(db, &self.table)?;
        let columns = whitelist.validate_columns(&table_ref, self.columns.as_deref())?;

        let filter = match &self.filter {
            Some(value) => Filter::from_json(value, compiler.filter_limits())?,
            None => None,
        };
        let order_by = match &self.order_by {
            Some(value) => OrderBy::from_json(value)?,
            None => Vec::new(),
        };

        compiler.compile(&table_ref, &columns, filter.as_ref(), &order_by, self.limit.as_ref())
    }
}
