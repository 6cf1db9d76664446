//! Aggregate inference evidence.
//!
//! Only counters and catalog database names live here.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::signals::SignalCategory;

/// How the winning database was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// One candidate scored strictly higher than every other.
    HighestScore,
    /// Several candidates tied on strong signals; the first one seen won.
    ScanOrderTieBreak,
}

/// Per-database tally.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateEvidence {
    pub database: String,
    pub score: u32,
    /// Match counts keyed by category name. Categories with no match are omitted.
    pub matches: BTreeMap<SignalCategory, u32>,
    pub distinct_categories: usize,
}

/// Summary returned alongside an inferred database.
#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    /// Catalog databases considered.
    pub candidates_count: usize,
    pub files_scanned: usize,
    /// Database names seen in files that the catalog does not contain.
    pub unmatched_hints: usize,
    /// Scoring candidates, best first.
    pub candidates: Vec<CandidateEvidence>,
    pub method: SelectionMethod,
}
