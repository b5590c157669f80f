//! Collection pass: cache lookup, rebuild on miss, projection.
//!
//! Rebuilds are single-flight. Concurrent passes that miss queue on one
//! guard; whoever gets it second re-reads the cache. When the store rejected
//! the write, the guard holds the unpersisted snapshot instead and waiters
//! reuse it while it is fresh, so there is still one build per TTL.
//!
//! Store I/O is blocking and runs on the blocking pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use sentrex_core::error::{Result, SentrexError};
use sentrex_core::model::{ProjectSelector, Snapshot};

use crate::builder::{BuildOptions, SnapshotBuilder};
use crate::cache::{unix_now, CacheLookup, SnapshotCache, SnapshotStore};
use crate::config::ExporterConfig;
use crate::obs::{ExporterMetrics, Sample};
use crate::projector::{MetricProjector, ProjectionOptions};
use crate::source::RemoteDataSource;

pub struct CollectionOrchestrator {
    org_slug: String,
    selector: ProjectSelector,
    ttl: Duration,
    cache: SnapshotCache,
    builder: SnapshotBuilder,
    projector: MetricProjector,
    metrics: Arc<ExporterMetrics>,
    rebuild: Mutex<Option<Snapshot>>,
}

impl CollectionOrchestrator {
    pub fn new(
        cfg: &ExporterConfig,
        source: Arc<dyn RemoteDataSource>,
        store: Arc<dyn SnapshotStore>,
        metrics: Arc<ExporterMetrics>,
    ) -> Self {
        Self {
            org_slug: cfg.sentry.org_slug.clone(),
            selector: cfg.project_selector(),
            ttl: cfg.cache.ttl(),
            cache: SnapshotCache::new(store),
            builder: SnapshotBuilder::new(Arc::clone(&source), BuildOptions::from_config(cfg)),
            projector: MetricProjector::new(source, ProjectionOptions::from_config(cfg)),
            metrics,
            rebuild: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// One full pass. Never fails; a pass with nothing to report yields no
    /// samples.
    pub async fn collect(&self) -> Vec<Sample> {
        let started = Instant::now();
        self.metrics.scrapes.inc(&[]);

        let samples = match self.resolve_snapshot().await {
            Ok(snapshot) => self.projector.project(&snapshot).await,
            Err(e) => {
                tracing::error!(org = %self.org_slug, kind = e.kind().as_str(), error = %e, "collector: no snapshot; emitting nothing");
                Vec::new()
            }
        };

        let elapsed = started.elapsed();
        self.metrics.collect_duration.set(&[], elapsed.as_secs_f64());
        tracing::info!(samples = samples.len(), elapsed_ms = elapsed.as_millis() as u64, "collector: pass complete");
        samples
    }

    /// Fresh cached snapshot, or a newly built and stored one.
    pub async fn resolve_snapshot(&self) -> Result<Snapshot> {
        if let Some(snapshot) = self.lookup().await {
            return Ok(snapshot);
        }

        let mut latest = self.rebuild.lock().await;

        // Another pass may have rebuilt while we waited.
        if let Some(snapshot) = self.lookup().await {
            return Ok(snapshot);
        }
        if let Some(snapshot) = latest.as_ref().filter(|s| s.is_fresh_at(unix_now())) {
            tracing::debug!(org = %self.org_slug, expire_at = snapshot.expire_at, "collector: serving last build from memory");
            return Ok(snapshot.clone());
        }

        let snapshot = match self.builder.build(&self.org_slug, &self.selector).await {
            Ok(s) => s,
            Err(e) => {
                self.metrics.rebuilds.inc(&[("result", "failed")]);
                return Err(e);
            }
        };
        self.metrics.rebuilds.inc(&[("result", "ok")]);

        let (snapshot, persisted) = self.store(snapshot).await?;
        *latest = if persisted { None } else { Some(snapshot.clone()) };
        Ok(snapshot)
    }

    /// Persist with a fresh `expire_at`. A rejected write is logged and the
    /// stamped snapshot is still returned, flagged as not persisted.
    async fn store(&self, mut snapshot: Snapshot) -> Result<(Snapshot, bool)> {
        let cache = self.cache.clone();
        let key = self.org_slug.clone();
        let ttl = self.ttl;

        let (snapshot, res) = tokio::task::spawn_blocking(move || {
            let res = cache.put(&key, &mut snapshot, ttl);
            (snapshot, res)
        })
        .await
        .map_err(|e| SentrexError::Internal(format!("cache write task failed: {e}")))?;

        if let Err(e) = &res {
            tracing::warn!(org = %self.org_slug, error = %e, "collector: snapshot not cached; serving from memory");
        }
        Ok((snapshot, res.is_ok()))
    }

    async fn lookup(&self) -> Option<Snapshot> {
        let cache = self.cache.clone();
        let key = self.org_slug.clone();

        let lookup = match tokio::task::spawn_blocking(move || cache.lookup(&key)).await {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::warn!(org = %self.org_slug, error = %e, "collector: cache read task failed");
                self.metrics.cache_lookups.inc(&[("result", "unreadable")]);
                return None;
            }
        };

        match lookup {
            CacheLookup::Hit(snapshot) => {
                self.metrics.cache_lookups.inc(&[("result", "hit")]);
                Some(snapshot)
            }
            CacheLookup::Miss(reason) => {
                self.metrics.cache_lookups.inc(&[("result", reason.as_str())]);
                None
            }
        }
    }
}
