//! Database inference for Quarry.
//!
//! Given a project directory, the engine reads a bounded set of files, looks
//! for signals naming a database (connection strings, env assignments, ORM
//! settings, table names) and picks the catalog database the project most
//! likely uses.
//!
//! Collection is a single pass. Each file's text is scanned and dropped at
//! once; only per-database counters survive, so the resulting [`Evidence`]
//! can never contain a path or a line of file content.

pub mod cancel;
pub mod engine;
pub mod error;
pub mod evidence;
mod scanner;
pub mod signals;

pub use cancel::CancellationToken;
pub use engine::{InferenceEngine, InferenceResult};
pub use error::InferenceError;
pub use evidence::{CandidateEvidence, Evidence, SelectionMethod};
pub use signals::SignalCategory;
