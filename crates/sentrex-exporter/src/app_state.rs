//! Shared application state for the exporter.
//!
//! Startup errors are returned, not panicked, so `main` decides the exit.

use std::sync::Arc;

use sentrex_core::error::Result;

use crate::cache::{FileStore, SnapshotStore};
use crate::collector::CollectionOrchestrator;
use crate::config::ExporterConfig;
use crate::obs::ExporterMetrics;
use crate::source::{RemoteDataSource, RetryPolicy, Retrying, SentryApi};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    collector: CollectionOrchestrator,
    metrics: Arc<ExporterMetrics>,
}

impl AppState {
    /// Production wiring: retried Sentry client and the on-disk cache file.
    pub fn new(cfg: ExporterConfig, api: SentryApi) -> Self {
        let policy = RetryPolicy::from(&cfg.http.retry);
        let source: Arc<dyn RemoteDataSource> = Arc::new(Retrying::new(api, policy));
        let store = FileStore::new(&cfg.cache.path);
        tracing::info!(path = %store.path().display(), ttl_secs = cfg.cache.ttl_secs, "app_state: snapshot cache file");
        Self::with_parts(cfg, source, Arc::new(store))
    }

    pub fn from_config(cfg: ExporterConfig) -> Result<Self> {
        let api = SentryApi::from_config(&cfg)?;
        Ok(Self::new(cfg, api))
    }

    /// Wire an arbitrary source and store (tests, embedding).
    pub fn with_parts(
        cfg: ExporterConfig,
        source: Arc<dyn RemoteDataSource>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let metrics = Arc::new(ExporterMetrics::default());
        let collector = CollectionOrchestrator::new(&cfg, source, store, Arc::clone(&metrics));
        Self {
            inner: Arc::new(AppStateInner { collector, metrics }),
        }
    }

    pub fn collector(&self) -> &CollectionOrchestrator {
        &self.inner.collector
    }

    pub fn metrics(&self) -> Arc<ExporterMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
