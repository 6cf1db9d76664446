//! Error types for database inference.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    /// Nothing in the scanned files pointed at a catalog database.
    #[error("no database signals found in the project")]
    NoSignalsFound,

    /// The evidence does not single out one database.
    #[error("cannot choose between databases: {}", candidates.join(", "))]
    Ambiguous { candidates: Vec<String> },

    /// The scan hit its deadline or was cancelled. Partial results are discarded.
    #[error("project scan aborted: {0}")]
    ScanAborted(&'static str),
}
