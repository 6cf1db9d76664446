//! Whitelist validation against a schema snapshot.
//!
//! Matching is exact and case-sensitive. There are no patterns and no
//! partial matches: a name is allowed only if the snapshot contains it
//! byte for byte.

use quarry_catalog::{DatabaseSchema, SchemaSnapshot, TableSchema};
use quarry_core::is_valid_identifier;

use crate::error::ValidationError;

/// A validated (database, table) pair with the table's full column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub database: String,
    pub table: String,
    /// Every whitelisted column, in ordinal order.
    pub columns: Vec<String>,
}

impl TableRef {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

/// Read-only view of a snapshot used to validate requested names.
pub struct Whitelist<'a> {
    snapshot: &'a SchemaSnapshot,
}

impl<'a> Whitelist<'a> {
    pub fn new(snapshot: &'a SchemaSnapshot) -> Self {
        Self { snapshot }
    }

    /// Accessible database names, sorted.
    pub fn databases(&self) -> Vec<String> {
        self.snapshot.database_names()
    }

    pub fn validate_database(&self, db: &str) -> Result<&'a DatabaseSchema, ValidationError> {
        if !is_valid_identifier(db) {
            return Err(ValidationError::invalid_identifier("Database"));
        }
        self.snapshot
            .get_database(db)
            .ok_or_else(|| ValidationError::unknown_database(db))
    }

    /// Table names in a validated database, sorted.
    pub fn tables(&self, db: &str) -> Result<Vec<String>, ValidationError> {
        Ok(self.validate_database(db)?.table_names())
    }

    pub fn describe(&self, db: &str, table: &str) -> Result<&'a TableSchema, ValidationError> {
        let schema = self.validate_database(db)?;
        if !is_valid_identifier(table) {
            return Err(ValidationError::invalid_identifier("Table"));
        }
        schema
            .get_table(table)
            .ok_or_else(|| ValidationError::unknown_table(db, table))
    }

    pub fn validate_table(&self, db: &str, table: &str) -> Result<TableRef, ValidationError> {
        let schema = self.describe(db, table)?;
        Ok(TableRef {
            database: db.to_string(),
            table: table.to_string(),
            columns: schema.column_names(),
        })
    }

    /// Resolve the requested column list.
    ///
    /// `None` or an empty list selects every whitelisted column in snapshot
    /// order. Repeated names are kept once, at their first position.
    pub fn validate_columns(
        &self,
        table_ref: &TableRef,
        requested: Option<&[String]>,
    ) -> Result<Vec<String>, ValidationError> {
        let requested = match requested {
            Some(cols) if !cols.is_empty() => cols,
            _ => return Ok(table_ref.columns.clone()),
        };

        let mut selected: Vec<String> = Vec::with_capacity(requested.len());
        for col in requested {
            if !is_valid_identifier(col) {
                return Err(ValidationError::invalid_identifier("Column"));
            }
            if !table_ref.has_column(col) {
                return Err(ValidationError::unknown_column(&table_ref.table, col));
            }
            if !selected.contains(col) {
                selected.push(col.clone());
            }
        }
        Ok(selected)
    }
}
