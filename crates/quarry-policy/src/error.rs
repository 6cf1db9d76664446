//! Validation error types for whitelist and compiler failures.
//!
//! Messages only ever echo names that pass the identifier charset; anything
//! else is rendered as `<invalid identifier>`.

use quarry_core::display_identifier;
use std::fmt;

/// Error type for validation failures.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The kind of validation error.
    pub kind: ValidationErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    // =========================================================================
    // WHITELIST ERRORS
    // =========================================================================

    /// A name failed the identifier charset check.
    pub fn invalid_identifier(what: &str) -> Self {
        Self::new(
            ValidationErrorKind::InvalidIdentifier,
            format!(
                "{} name must be 1-64 ASCII letters, digits or underscores",
                what
            ),
        )
    }

    /// Create an unknown database error.
    pub fn unknown_database(db: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownDatabase,
            format!("Unknown database '{}'", display_identifier(db)),
        )
    }

    /// Create an unknown table error.
    pub fn unknown_table(db: &str, table: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownTable,
            format!(
                "Unknown table '{}' in database '{}'",
                display_identifier(table),
                display_identifier(db)
            ),
        )
    }

    /// Create an unknown column error.
    pub fn unknown_column(table: &str, column: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownColumn,
            format!(
                "Unknown column '{}' in table '{}'",
                display_identifier(column),
                display_identifier(table)
            ),
        )
    }

    // =========================================================================
    // COMPILER ERRORS
    // =========================================================================

    /// Create an invalid filter error.
    /// The table has no column that passed the charset check.
    pub fn no_whitelisted_columns(table: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownColumn,
            format!(
                "Table '{}' exposes no whitelisted columns",
                display_identifier(table)
            ),
        )
    }

    pub fn invalid_filter(reason: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::InvalidFilter, reason)
    }

    /// Create an invalid order_by error.
    pub fn invalid_order_by(reason: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::InvalidOrderBy, reason)
    }

    /// Create a limit out of range error.
    pub fn limit_out_of_range(requested: impl fmt::Display, max: u64) -> Self {
        Self::new(
            ValidationErrorKind::LimitOutOfRange,
            format!("limit must be between 1 and {}, got {}", max, requested),
        )
    }

    /// Stable kind name reported to callers.
    pub fn kind_str(&self) -> &'static str {
        self.kind.as_str()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    // =========================================================================
    // Whitelist errors
    // =========================================================================
    /// Name is empty, too long or contains disallowed characters.
    InvalidIdentifier,
    /// Database is not in the snapshot.
    UnknownDatabase,
    /// Table is not in the database.
    UnknownTable,
    /// Column is not in the table.
    UnknownColumn,

    // =========================================================================
    // Compiler errors
    // =========================================================================
    /// Predicate is malformed, names an unknown column or exceeds a bound.
    InvalidFilter,
    /// Sort key is malformed or not among the selected columns.
    InvalidOrderBy,
    /// Limit is not positive or exceeds the ceiling.
    LimitOutOfRange,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier => "InvalidIdentifier",
            Self::UnknownDatabase => "UnknownDatabase",
            Self::UnknownTable => "UnknownTable",
            Self::UnknownColumn => "UnknownColumn",
            Self::InvalidFilter => "InvalidFilter",
            Self::InvalidOrderBy => "InvalidOrderBy",
            Self::LimitOutOfRange => "LimitOutOfRange",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
