#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use common::{config, two_project_state, FakeSource};
use sentrex_core::error::{Result, SentrexError};
use sentrex_core::model::Snapshot;
use sentrex_exporter::cache::{unix_now, MemoryStore, SnapshotStore};
use sentrex_exporter::collector::CollectionOrchestrator;
use sentrex_exporter::obs::{ExporterMetrics, Family};

struct Harness {
    src: Arc<FakeSource>,
    store: Arc<MemoryStore>,
    metrics: Arc<ExporterMetrics>,
    collector: Arc<CollectionOrchestrator>,
}

fn harness(src: FakeSource) -> Harness {
    let src = Arc::new(src);
    let store = Arc::new(MemoryStore::new());
    let metrics = Arc::new(ExporterMetrics::default());
    let collector = Arc::new(CollectionOrchestrator::new(
        &config(),
        src.clone(),
        store.clone(),
        metrics.clone(),
    ));
    Harness {
        src,
        store,
        metrics,
        collector,
    }
}

fn build_calls(src: &FakeSource) -> usize {
    ["organization", "projects", "project", "environments", "issues"]
        .iter()
        .map(|op| src.calls(op))
        .sum()
}

#[tokio::test]
async fn miss_builds_caches_and_projects() {
    let h = harness(FakeSource::new(two_project_state()));

    let samples = h.collector.collect().await;
    assert!(samples.iter().any(|s| s.family == Family::OpenIssuesHistogram));
    assert!(h.store.contains("acme"));
    assert_eq!(h.src.calls("organization"), 1);
    assert_eq!(h.metrics.rebuilds.get(&[("result", "ok")]), Some(1));
    assert_eq!(h.metrics.cache_lookups.get(&[("result", "absent")]), Some(2));
    assert_eq!(h.metrics.scrapes.get(&[]), Some(1));
}

#[tokio::test]
async fn fresh_cache_serves_without_rebuilding() {
    let h = harness(FakeSource::new(two_project_state()));
    let first = h.collector.collect().await;
    let before = build_calls(&h.src);

    let second = h.collector.collect().await;
    assert_eq!(build_calls(&h.src), before);
    assert_eq!(first, second);
    assert_eq!(h.metrics.cache_lookups.get(&[("result", "hit")]), Some(1));
}

#[tokio::test]
async fn expired_entry_is_rebuilt_with_a_later_expiration() {
    let h = harness(FakeSource::new(two_project_state()));
    let old_expiry = unix_now() - 10;

    let mut stale = h.collector.resolve_snapshot().await.unwrap();
    h.collector
        .cache()
        .put_at("acme", &mut stale, Duration::from_secs(1), old_expiry - 1)
        .unwrap();
    let calls = h.src.calls("organization");

    let rebuilt = h.collector.resolve_snapshot().await.unwrap();
    assert_eq!(h.src.calls("organization"), calls + 1);
    assert!(rebuilt.expire_at > old_expiry);

    let cached = h.collector.cache().get("acme").expect("replacement cached");
    assert_eq!(cached.expire_at, rebuilt.expire_at);
    assert_eq!(h.metrics.cache_lookups.get(&[("result", "expired")]), Some(1));
}

#[tokio::test]
async fn partial_environment_failure_still_yields_other_projects() {
    let src = FakeSource::new(two_project_state());
    src.with(|s| s.fail_envs.insert("api".into()));
    let h = harness(src);

    let samples = h.collector.collect().await;
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| s.label("project_slug") == Some("web")));
}

#[tokio::test]
async fn fatal_build_yields_no_samples_and_caches_nothing() {
    let src = FakeSource::new(two_project_state());
    src.with(|s| s.org = None);
    let h = harness(src);

    assert!(h.collector.collect().await.is_empty());
    assert!(!h.store.contains("acme"));
    assert_eq!(h.metrics.rebuilds.get(&[("result", "failed")]), Some(1));

    // Recovery on the next pass.
    h.src.with(|s| s.org = Some(common::org("acme")));
    assert!(!h.collector.collect().await.is_empty());
}

#[tokio::test]
async fn concurrent_misses_build_once() {
    let src = FakeSource::new(two_project_state());
    src.with(|s| s.org_delay = Some(Duration::from_millis(50)));
    let h = harness(src);

    let passes = join_all((0..8).map(|_| {
        let c = h.collector.clone();
        async move { c.collect().await }
    }))
    .await;

    assert_eq!(h.src.calls("organization"), 1);
    assert_eq!(h.src.calls("projects"), 1);
    assert_eq!(h.metrics.rebuilds.get(&[("result", "ok")]), Some(1));
    assert!(passes.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn concurrent_misses_across_tasks_build_once() {
    let src = FakeSource::new(two_project_state());
    src.with(|s| s.org_delay = Some(Duration::from_millis(50)));
    let h = harness(src);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let c = h.collector.clone();
            tokio::spawn(async move { c.collect().await.len() })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap() > 0);
    }
    assert_eq!(h.src.calls("organization"), 1);
}

struct ReadOnlyStore;

impl SnapshotStore for ReadOnlyStore {
    fn load(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
    fn store(&self, _key: &str, _bytes: &[u8]) -> Result<()> {
        Err(SentrexError::Io("read-only".into()))
    }
    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn cache_write_failure_does_not_fail_the_pass() {
    let src = Arc::new(FakeSource::new(two_project_state()));
    let collector = CollectionOrchestrator::new(
        &config(),
        src.clone(),
        Arc::new(ReadOnlyStore),
        Arc::new(ExporterMetrics::default()),
    );

    let snap: Snapshot = collector.resolve_snapshot().await.unwrap();
    assert!(snap.expire_at > unix_now());
    assert!(!collector.collect().await.is_empty());
    // The unwritable store never hits; the last build is reused until it expires.
    assert_eq!(src.calls("organization"), 1);
}

#[tokio::test]
async fn concurrent_misses_build_once_when_store_rejects_writes() {
    let src = Arc::new(FakeSource::new(two_project_state()));
    src.with(|s| s.org_delay = Some(Duration::from_millis(50)));
    let metrics = Arc::new(ExporterMetrics::default());
    let collector = Arc::new(CollectionOrchestrator::new(
        &config(),
        src.clone(),
        Arc::new(ReadOnlyStore),
        metrics.clone(),
    ));

    let passes = join_all((0..8).map(|_| {
        let c = collector.clone();
        async move { c.collect().await }
    }))
    .await;

    assert_eq!(src.calls("organization"), 1);
    assert_eq!(src.calls("projects"), 1);
    assert_eq!(metrics.rebuilds.get(&[("result", "ok")]), Some(1));
    assert!(!passes[0].is_empty());
    assert!(passes.windows(2).all(|w| w[0] == w[1]));
}
