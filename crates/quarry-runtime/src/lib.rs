//! Execution seam for compiled queries.
//!
//! Adapters implement [`QueryExecutor`]; callers go through [`run_bounded`],
//! which applies the per-query timeout and the row limit regardless of what
//! the adapter does.

pub mod executor;

pub use executor::{ExecutionError, QueryExecutor, Row, run_bounded};
