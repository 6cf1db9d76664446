//! Per-session default database.
//!
//! A session remembers the database a caller last selected or had inferred
//! for it. stdio runs one session per process; the HTTP transport keys
//! sessions by the `Mcp-Session-Id` header.

use quarry_catalog::SchemaSnapshot;
use quarry_core::McpConfig;
use quarry_infer::{CancellationToken, Evidence, InferenceEngine, InferenceError, InferenceResult};
use quarry_policy::Whitelist;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::GatewayError;

/// Headroom above the scan budget before the blocking task is abandoned.
const INFERENCE_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
pub struct SessionState {
    current: Option<String>,
    last_evidence: Option<Evidence>,
    inference_failed: bool,
}

impl SessionState {
    pub fn last_evidence(&self) -> Option<&Evidence> {
        self.last_evidence.as_ref()
    }

    /// Forget the current database and any failed inference attempt.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One caller's session. Calls within a session are serialized.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, SessionState> {
        self.state.lock().await
    }
}

#[derive(Debug)]
struct StoredSession {
    session: Arc<Session>,
    last_used: Instant,
}

/// Sessions of the HTTP transport, keyed by session id.
///
/// Sessions idle for longer than `idle` are dropped, and opening a session
/// beyond `capacity` evicts the least recently used one.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    idle: Duration,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from(&McpConfig::default())
    }
}

impl From<&McpConfig> for SessionStore {
    fn from(config: &McpConfig) -> Self {
        Self::with_limits(config.session_idle(), config.max_sessions)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle: Duration, capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle,
            capacity: capacity.max(1),
        }
    }

    /// Open a session under a fresh id.
    pub fn create(&self) -> (String, Arc<Session>) {
        self.create_at(Instant::now())
    }

    fn create_at(&self, now: Instant) -> (String, Arc<Session>) {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(Session::new());

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, stored| now.saturating_duration_since(stored.last_used) < self.idle);
        while sessions.len() >= self.capacity {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, stored)| stored.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
        }
        let dropped = before - sessions.len();
        if dropped > 0 {
            debug!(dropped, "Dropped idle MCP sessions");
        }

        sessions.insert(
            id.clone(),
            StoredSession {
                session: session.clone(),
                last_used: now,
            },
        );
        (id, session)
    }

    /// Look up a live session and mark it used. Expired sessions are removed.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.get_at(id, Instant::now())
    }

    fn get_at(&self, id: &str, now: Instant) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let stored = sessions.get_mut(id)?;
        if now.saturating_duration_since(stored.last_used) >= self.idle {
            sessions.remove(id);
            return None;
        }
        stored.last_used = now;
        Some(stored.session.clone())
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decides which database a call runs against.
#[derive(Clone)]
pub struct DatabaseResolver {
    engine: Arc<InferenceEngine>,
    project_root: Option<PathBuf>,
}

impl DatabaseResolver {
    /// `project_root` falls back to the engine's configured root, then to
    /// the process working directory.
    pub fn new(engine: InferenceEngine) -> Self {
        let project_root = engine
            .config()
            .project_root
            .clone()
            .or_else(|| std::env::current_dir().ok());
        Self {
            engine: Arc::new(engine),
            project_root,
        }
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// The session's database, dropped if it no longer exists in `snapshot`.
    pub fn current_database(
        &self,
        state: &mut SessionState,
        snapshot: &SchemaSnapshot,
    ) -> Option<String> {
        match &state.current {
            Some(db) if snapshot.contains_database(db) => Some(db.clone()),
            Some(_) => {
                info!("Session database no longer exists; clearing session");
                state.reset();
                None
            }
            None => None,
        }
    }

    pub fn set_database(
        &self,
        state: &mut SessionState,
        snapshot: &SchemaSnapshot,
        db: &str,
    ) -> Result<(), GatewayError> {
        Whitelist::new(snapshot).validate_database(db)?;
        state.current = Some(db.to_string());
        state.inference_failed = false;
        debug!(database = %db, "Session database set");
        Ok(())
    }

    /// Target database for a call.
    ///
    /// Order: the explicit name, the session database, one automatic
    /// inference over the project root, then the only database in the
    /// catalog. Inference and the single-database fallback become the
    /// session database.
    pub async fn resolve(
        &self,
        state: &mut SessionState,
        snapshot: &Arc<SchemaSnapshot>,
        explicit: Option<&str>,
    ) -> Result<String, GatewayError> {
        if let Some(db) = explicit {
            Whitelist::new(snapshot).validate_database(db)?;
            return Ok(db.to_string());
        }

        if let Some(db) = self.current_database(state, snapshot) {
            return Ok(db);
        }

        if !state.inference_failed {
            match &self.project_root {
                Some(root) => match self.run(root.clone(), snapshot.clone(), None).await {
                    Ok(result) => {
                        let db = result.database.clone();
                        state.current = Some(db.clone());
                        state.last_evidence = Some(result.evidence);
                        return Ok(db);
                    }
                    Err(e) => {
                        debug!(kind = e.kind(), "Automatic inference failed");
                        state.inference_failed = true;
                    }
                },
                None => state.inference_failed = true,
            }
        }

        if let [only] = snapshot.database_names().as_slice() {
            debug!(database = %only, "Using the only visible database");
            state.current = Some(only.clone());
            return Ok(only.clone());
        }

        Err(GatewayError::NoDefaultDatabase)
    }

    /// Explicit inference. Always scans; the session database takes part in
    /// the ambiguity check and is replaced on success.
    pub async fn infer(
        &self,
        state: &mut SessionState,
        snapshot: &Arc<SchemaSnapshot>,
        project_root: Option<PathBuf>,
    ) -> Result<InferenceResult, GatewayError> {
        let root = project_root
            .or_else(|| self.project_root.clone())
            .ok_or(GatewayError::Inference(InferenceError::NoSignalsFound))?;
        let session_db = self.current_database(state, snapshot);

        let result = self.run(root, snapshot.clone(), session_db).await?;
        state.current = Some(result.database.clone());
        state.last_evidence = Some(result.evidence.clone());
        state.inference_failed = false;
        Ok(result)
    }

    /// Scan on the blocking pool, cancelling if the task overruns its budget.
    async fn run(
        &self,
        root: PathBuf,
        snapshot: Arc<SchemaSnapshot>,
        session_db: Option<String>,
    ) -> Result<InferenceResult, GatewayError> {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let engine = self.engine.clone();
        let budget = Duration::from_millis(engine.config().time_budget_ms) + INFERENCE_GRACE;

        let task = tokio::task::spawn_blocking(move || {
            engine.infer(&root, &snapshot, session_db.as_deref(), &task_cancel)
        });

        match tokio::time::timeout(budget, task).await {
            Ok(Ok(result)) => result.map_err(GatewayError::from),
            Ok(Err(e)) => {
                warn!(error = %e, "Inference task failed");
                Err(InferenceError::ScanAborted("scan task failed").into())
            }
            Err(_) => {
                cancel.cancel();
                warn!(budget_ms = budget.as_millis() as u64, "Inference overran its budget");
                Err(InferenceError::ScanAborted("time budget exceeded").into())
            }
        }
    }
}
