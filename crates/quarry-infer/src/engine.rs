//! Scoring and database selection.

use quarry_catalog::SchemaSnapshot;
use quarry_core::{InferenceConfig, SignalWeights};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::error::InferenceError;
use crate::evidence::{CandidateEvidence, Evidence, SelectionMethod};
use crate::scanner::Scanner;
use crate::signals::{SignalCategory, extract};

/// An inferred database together with the evidence behind it.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceResult {
    pub database: String,
    pub evidence: Evidence,
}

#[derive(Debug, Clone)]
pub struct InferenceEngine {
    config: InferenceConfig,
}

/// Running counts for one catalog database, in first-seen order.
struct Tally {
    database: String,
    counts: [u32; 4],
}

impl Tally {
    fn score(&self, weights: &SignalWeights) -> u32 {
        SignalCategory::ALL
            .iter()
            .fold(0u32, |score, c| {
                score.saturating_add(weight(weights, *c).saturating_mul(self.counts[c.index()]))
            })
    }

    fn only_table_literals(&self) -> bool {
        SignalCategory::ALL
            .iter()
            .filter(|c| **c != SignalCategory::TableLiteral)
            .all(|c| self.counts[c.index()] == 0)
    }
}

fn weight(weights: &SignalWeights, category: SignalCategory) -> u32 {
    match category {
        SignalCategory::ConnectionString => weights.connection_string,
        SignalCategory::EnvAssignment => weights.env_assignment,
        SignalCategory::OrmConfig => weights.orm_config,
        SignalCategory::TableLiteral => weights.table_literal,
    }
}

impl InferenceEngine {
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Scan `root` and pick the catalog database it most likely uses.
    ///
    /// `session_db` is the caller's current database, if any. A session
    /// database that scores close to the winner makes the result ambiguous
    /// rather than silently switching databases.
    pub fn infer(
        &self,
        root: &Path,
        snapshot: &SchemaSnapshot,
        session_db: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<InferenceResult, InferenceError> {
        let deadline = Instant::now() + Duration::from_millis(self.config.time_budget_ms);
        let table_index = snapshot.table_index();

        let mut tallies: Vec<Tally> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut unmatched_hints = 0usize;

        let mut credit = |db: &str, category: SignalCategory| {
            let idx = match positions.get(db) {
                Some(idx) => *idx,
                None => {
                    tallies.push(Tally {
                        database: db.to_string(),
                        counts: [0; 4],
                    });
                    positions.insert(db.to_string(), tallies.len() - 1);
                    tallies.len() - 1
                }
            };
            tallies[idx].counts[category.index()] += 1;
        };

        let files_scanned = Scanner::new(&self.config, cancel, deadline).run(root, |text| {
            let signals = extract(text, &table_index);
            for (category, name) in &signals.hints {
                if snapshot.contains_database(name) {
                    credit(name, *category);
                } else {
                    unmatched_hints += 1;
                }
            }
            for db in &signals.table_hits {
                credit(db, SignalCategory::TableLiteral);
            }
        })?;

        debug!(
            files_scanned,
            candidates = tallies.len(),
            unmatched_hints,
            "Project scan complete"
        );

        let (winner, method) = self.select(&tallies, session_db)?;

        let mut ranked: Vec<&Tally> = tallies.iter().collect();
        // Stable sort keeps scan order among equal scores.
        ranked.sort_by(|a, b| b.score(&self.config.weights).cmp(&a.score(&self.config.weights)));

        let candidates = ranked
            .into_iter()
            .map(|t| {
                let matches: BTreeMap<SignalCategory, u32> = SignalCategory::ALL
                    .iter()
                    .filter(|c| t.counts[c.index()] > 0)
                    .map(|c| (*c, t.counts[c.index()]))
                    .collect();
                CandidateEvidence {
                    database: t.database.clone(),
                    score: t.score(&self.config.weights),
                    distinct_categories: matches.len(),
                    matches,
                }
            })
            .collect();

        info!(database = %winner, method = ?method, "Inferred database");

        Ok(InferenceResult {
            database: winner,
            evidence: Evidence {
                candidates_count: snapshot.databases.len(),
                files_scanned,
                unmatched_hints,
                candidates,
                method,
            },
        })
    }

    fn select(
        &self,
        tallies: &[Tally],
        session_db: Option<&str>,
    ) -> Result<(String, SelectionMethod), InferenceError> {
        let weights = &self.config.weights;
        let top_score = tallies.iter().map(|t| t.score(weights)).max().unwrap_or(0);
        if top_score == 0 {
            return Err(InferenceError::NoSignalsFound);
        }

        let tied: Vec<&Tally> = tallies
            .iter()
            .filter(|t| t.score(weights) == top_score)
            .collect();
        let names = |ts: &[&Tally]| ts.iter().map(|t| t.database.clone()).collect::<Vec<_>>();

        let (winner, method) = match tied.as_slice() {
            [only] => (*only, SelectionMethod::HighestScore),
            [first, ..] => {
                if tied.iter().all(|t| t.only_table_literals()) || session_db.is_some() {
                    return Err(InferenceError::Ambiguous {
                        candidates: names(&tied),
                    });
                }
                (*first, SelectionMethod::ScanOrderTieBreak)
            }
            [] => return Err(InferenceError::NoSignalsFound),
        };

        if let Some(session) = session_db {
            if session != winner.database {
                let session_score = tallies
                    .iter()
                    .find(|t| t.database == session)
                    .map(|t| t.score(weights))
                    .unwrap_or(0);
                if session_score.saturating_add(self.config.ambiguity_margin) >= top_score {
                    return Err(InferenceError::Ambiguous {
                        candidates: vec![winner.database.clone(), session.to_string()],
                    });
                }
            }
        }

        Ok((winner.database.clone(), method))
    }
}
