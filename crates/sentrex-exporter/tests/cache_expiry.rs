#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{issue, org, project};
use sentrex_core::model::{Snapshot, TimeWindow};
use sentrex_exporter::cache::{
    CacheLookup, FileStore, MemoryStore, MissReason, SnapshotCache, SnapshotStore,
};

const NOW: i64 = 1_714_560_000;
const TTL: Duration = Duration::from_secs(120);

fn snapshot() -> Snapshot {
    let mut snap = Snapshot::new(org("acme"));
    snap.push_project(project("11", "api"));
    snap.set_environments("api", vec!["production".into()]);
    snap.record_issues("api", "production", TimeWindow::OneDay, vec![issue("101", "7")]);
    snap
}

fn miss_reason(lookup: CacheLookup) -> MissReason {
    match lookup {
        CacheLookup::Miss(reason) => reason,
        CacheLookup::Hit(_) => panic!("expected a miss"),
    }
}

#[test]
fn fresh_entry_round_trips() {
    let store = Arc::new(MemoryStore::new());
    let cache = SnapshotCache::new(store.clone());

    let mut snap = snapshot();
    cache.put_at("acme", &mut snap, TTL, NOW).unwrap();
    assert_eq!(snap.expire_at, NOW + 120);

    let hit = cache.lookup_at("acme", NOW + 119).into_hit().expect("fresh");
    assert_eq!(hit, snap);
    assert!(store.contains("acme"));
}

#[test]
fn oversized_ttl_clamps_instead_of_wrapping() {
    let cache = SnapshotCache::new(Arc::new(MemoryStore::new()));

    let mut snap = snapshot();
    cache.put_at("acme", &mut snap, Duration::from_secs(u64::MAX), NOW).unwrap();
    assert_eq!(snap.expire_at, i64::MAX);
    assert!(cache.lookup_at("acme", NOW).into_hit().is_some());
}

#[test]
fn entry_expires_at_the_boundary_and_is_deleted() {
    let store = Arc::new(MemoryStore::new());
    let cache = SnapshotCache::new(store.clone());

    let mut snap = snapshot();
    cache.put_at("acme", &mut snap, TTL, NOW).unwrap();

    assert_eq!(miss_reason(cache.lookup_at("acme", NOW + 120)), MissReason::Expired);
    assert!(!store.contains("acme"));
    assert_eq!(miss_reason(cache.lookup_at("acme", NOW)), MissReason::Absent);
}

#[test]
fn undecodable_entry_is_a_miss() {
    let store = Arc::new(MemoryStore::new());
    store.store("acme", b"{not json").unwrap();
    let cache = SnapshotCache::new(store);

    assert_eq!(miss_reason(cache.lookup_at("acme", NOW)), MissReason::Corrupt);
}

#[test]
fn entry_without_expiration_is_corrupt() {
    let store = Arc::new(MemoryStore::new());
    let mut raw = serde_json::to_value(snapshot()).unwrap();
    raw.as_object_mut().unwrap().remove("expire_at");
    store.store("acme", raw.to_string().as_bytes()).unwrap();

    let zero = Arc::new(MemoryStore::new());
    zero.store("acme", serde_json::to_string(&snapshot()).unwrap().as_bytes())
        .unwrap();

    assert_eq!(
        miss_reason(SnapshotCache::new(store).lookup_at("acme", NOW)),
        MissReason::Corrupt
    );
    assert_eq!(
        miss_reason(SnapshotCache::new(zero).lookup_at("acme", NOW)),
        MissReason::Corrupt
    );
}

#[test]
fn entry_for_another_organization_is_corrupt() {
    let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
    let cache = SnapshotCache::new(store.clone());
    let mut snap = snapshot();
    cache.put_at("acme", &mut snap, TTL, NOW).unwrap();

    // Same bytes served for a different key, as a single-file store would.
    let bytes = store.load("acme").unwrap().unwrap();
    store.store("globex", &bytes).unwrap();
    assert_eq!(miss_reason(cache.lookup_at("globex", NOW)), MissReason::Corrupt);
}

#[test]
fn persisted_layout_uses_cache_field_names() {
    let store = Arc::new(MemoryStore::new());
    let cache = SnapshotCache::new(store.clone());
    let mut snap = snapshot();
    cache.put_at("acme", &mut snap, TTL, NOW).unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&store.load("acme").unwrap().unwrap()).unwrap();
    assert_eq!(raw["org"]["slug"], "acme");
    assert_eq!(raw["projects"][0]["slug"], "api");
    assert_eq!(raw["projects_envs"]["api"][0], "production");
    assert_eq!(raw["projects_data"]["api"]["production"]["24h"][0]["count"], "7");
    assert_eq!(raw["expire_at"], NOW + 120);
}

#[test]
fn file_store_persists_and_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.json");
    let store = Arc::new(FileStore::new(&path));
    let cache = SnapshotCache::new(store.clone());

    assert_eq!(miss_reason(cache.lookup_at("acme", NOW)), MissReason::Absent);

    let mut snap = snapshot();
    cache.put_at("acme", &mut snap, TTL, NOW).unwrap();
    assert!(path.exists());

    let mut newer = snapshot();
    newer.push_project(project("12", "web"));
    cache.put_at("acme", &mut newer, TTL, NOW + 300).unwrap();

    // A second cache over the same file sees the replacement.
    let reopened = SnapshotCache::new(Arc::new(FileStore::new(&path)));
    let hit = reopened.lookup_at("acme", NOW + 301).into_hit().unwrap();
    assert_eq!(hit.projects.len(), 2);
    assert_eq!(hit.expire_at, NOW + 420);
    assert!(!store.path().with_extension("json.tmp").exists());
}

#[test]
fn file_store_deletes_expired_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let cache = SnapshotCache::new(Arc::new(FileStore::new(&path)));

    let mut snap = snapshot();
    cache.put_at("acme", &mut snap, TTL, NOW).unwrap();
    assert_eq!(miss_reason(cache.lookup_at("acme", NOW + 500)), MissReason::Expired);
    assert!(!path.exists());
}

#[test]
fn truncated_file_is_a_miss_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, br#"{"org":{"id":"1","slug":"acme"},"projects":["#).unwrap();

    let cache = SnapshotCache::new(Arc::new(FileStore::new(&path)));
    assert!(cache.get("acme").is_none());
}
