//! Snapshot publication and refresh.

use chrono::Utc;
use quarry_core::CatalogConfig;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::snapshot::SchemaSnapshot;
use crate::source::{MetadataSource, RawMetadata};

/// Refresh policy for a [`SchemaCatalog`].
#[derive(Debug, Clone)]
pub struct CatalogPolicy {
    /// Snapshots older than this are refreshed on next use.
    pub max_age: Option<Duration>,
    /// Hidden in addition to the system databases.
    pub excluded_databases: BTreeSet<String>,
    /// Delay before the single retry of a failed fetch.
    pub retry_delay: Duration,
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        Self::from(&CatalogConfig::default())
    }
}

impl From<&CatalogConfig> for CatalogPolicy {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            max_age: config.max_age_secs.map(Duration::from_secs),
            excluded_databases: config.excluded_databases.iter().cloned().collect(),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Owner of the current [`SchemaSnapshot`].
///
/// Readers take a cheap `Arc` clone under a short read lock. Refreshes are
/// serialized; a caller that queued behind a refresh which published a newer
/// generation reuses that result instead of fetching again.
pub struct SchemaCatalog {
    source: Arc<dyn MetadataSource>,
    policy: CatalogPolicy,
    current: RwLock<Option<Arc<SchemaSnapshot>>>,
    refresh_lock: Mutex<()>,
    generation: AtomicU64,
}

impl SchemaCatalog {
    pub fn new(source: Arc<dyn MetadataSource>, policy: CatalogPolicy) -> Self {
        Self {
            source,
            policy,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Current snapshot, refreshing first when none is published or the
    /// published one has outlived `max_age`.
    pub async fn snapshot(&self) -> Result<Arc<SchemaSnapshot>, CatalogError> {
        match self.published() {
            Some(snapshot) if !self.is_stale(&snapshot) => Ok(snapshot),
            Some(snapshot) => {
                debug!(generation = snapshot.generation, "Schema snapshot is stale");
                self.refresh_after(snapshot.generation).await
            }
            None => self.refresh_after(0).await,
        }
    }

    /// Fetch fresh metadata and publish a new snapshot.
    pub async fn refresh(&self) -> Result<Arc<SchemaSnapshot>, CatalogError> {
        let seen = self.published().map(|s| s.generation).unwrap_or(0);
        self.refresh_after(seen).await
    }

    /// Drop the published snapshot. The next read refreshes.
    pub fn invalidate(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = current.take() {
            info!(generation = old.generation, "Schema snapshot invalidated");
        }
    }

    /// Snapshot currently published, without refreshing.
    pub fn published(&self) -> Option<Arc<SchemaSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_stale(&self, snapshot: &SchemaSnapshot) -> bool {
        let Some(max_age) = self.policy.max_age else {
            return false;
        };
        let age = Utc::now().signed_duration_since(snapshot.captured_at);
        age.to_std().map(|age| age >= max_age).unwrap_or(false)
    }

    async fn refresh_after(&self, seen: u64) -> Result<Arc<SchemaSnapshot>, CatalogError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(snapshot) = self.published() {
            if snapshot.generation > seen && !self.is_stale(&snapshot) {
                return Ok(snapshot);
            }
        }

        let raw = self.fetch_with_retry().await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(SchemaSnapshot::build(
            raw,
            generation,
            &self.policy.excluded_databases,
        ));

        info!(
            generation,
            databases = snapshot.databases.len(),
            "Published schema snapshot"
        );

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn fetch_with_retry(&self) -> Result<RawMetadata, CatalogError> {
        match self.source.fetch().await {
            Ok(raw) => Ok(raw),
            Err(first) => {
                warn!(error = %first, "Metadata fetch failed, retrying once");
                tokio::time::sleep(self.policy.retry_delay).await;
                self.source.fetch().await.map_err(|second| {
                    warn!(error = %second, "Metadata fetch failed after retry");
                    CatalogError::Unavailable(second)
                })
            }
        }
    }
}
