//! Quarry policy enforcement.
//!
//! Every read passes through two pure stages before it reaches a database:
//!
//! 1. [`Whitelist`] checks each database, table and column name against the
//!    current [`quarry_catalog::SchemaSnapshot`]. Unknown names are rejected;
//!    nothing is assumed to exist.
//! 2. [`QueryCompiler`] turns the validated request into a single
//!    parameterized `SELECT`. Caller values only ever travel as bound
//!    parameters and the row limit is bounded by [`LimitPolicy`].

pub mod compiler;
pub mod error;
pub mod filter;
pub mod request;
pub mod validator;

pub use compiler::{CompiledQuery, LimitPolicy, QueryCompiler, SqlValue};
pub use error::{ValidationError, ValidationErrorKind};
pub use filter::{CompareOp, Filter, FilterLimits, OrderBy, SortDirection};
pub use request::SelectRequest;
pub use validator::{TableRef, Whitelist};
