//! Expiring snapshot cache over a `SnapshotStore`.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sentrex_core::error::{Result, SentrexError};
use sentrex_core::model::Snapshot;

use super::store::SnapshotStore;

/// Seconds since the unix epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Why a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Absent,
    Corrupt,
    Expired,
    Unreadable,
}

impl MissReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MissReason::Absent => "absent",
            MissReason::Corrupt => "corrupt",
            MissReason::Expired => "expired",
            MissReason::Unreadable => "unreadable",
        }
    }
}

#[derive(Debug)]
pub enum CacheLookup {
    Hit(Snapshot),
    Miss(MissReason),
}

impl CacheLookup {
    pub fn into_hit(self) -> Option<Snapshot> {
        match self {
            CacheLookup::Hit(s) => Some(s),
            CacheLookup::Miss(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct SnapshotCache {
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Usable snapshot for `key`, or `None`. Never fails.
    pub fn get(&self, key: &str) -> Option<Snapshot> {
        self.lookup_at(key, unix_now()).into_hit()
    }

    pub fn lookup(&self, key: &str) -> CacheLookup {
        self.lookup_at(key, unix_now())
    }

    /// Lookup against an explicit clock. Expired entries are deleted.
    pub fn lookup_at(&self, key: &str, now: i64) -> CacheLookup {
        let bytes = match self.store.load(key) {
            Ok(Some(b)) => b,
            Ok(None) => {
                tracing::debug!(%key, "cache: no entry");
                return CacheLookup::Miss(MissReason::Absent);
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "cache: store read failed");
                return CacheLookup::Miss(MissReason::Unreadable);
            }
        };

        let snapshot = match decode(key, &bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(%key, kind = e.kind().as_str(), error = %e, "cache: discarding corrupt entry");
                return CacheLookup::Miss(MissReason::Corrupt);
            }
        };

        if !snapshot.is_fresh_at(now) {
            tracing::info!(%key, expire_at = snapshot.expire_at, now, "cache: entry expired; deleting");
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(%key, error = %e, "cache: failed to delete expired entry");
            }
            return CacheLookup::Miss(MissReason::Expired);
        }

        tracing::debug!(%key, expire_at = snapshot.expire_at, "cache: hit");
        CacheLookup::Hit(snapshot)
    }

    /// Stamp `expire_at = now + ttl` and persist, replacing any prior entry.
    pub fn put(&self, key: &str, snapshot: &mut Snapshot, ttl: Duration) -> Result<()> {
        self.put_at(key, snapshot, ttl, unix_now())
    }

    pub fn put_at(&self, key: &str, snapshot: &mut Snapshot, ttl: Duration, now: i64) -> Result<()> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        snapshot.expire_at = now.saturating_add(ttl_secs);
        let bytes = serde_json::to_vec(snapshot)
            .map_err(|e| SentrexError::Internal(format!("snapshot encode failed: {e}")))?;
        self.store.store(key, &bytes)?;
        tracing::info!(%key, expire_at = snapshot.expire_at, bytes = bytes.len(), "cache: snapshot written");
        Ok(())
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<Snapshot> {
    let snapshot: Snapshot = serde_json::from_slice(bytes)
        .map_err(|e| SentrexError::CacheCorruption(format!("undecodable snapshot: {e}")))?;
    if snapshot.expire_at <= 0 {
        return Err(SentrexError::CacheCorruption(format!(
            "invalid expire_at: {}",
            snapshot.expire_at
        )));
    }
    if snapshot.organization.slug != key {
        return Err(SentrexError::CacheCorruption(format!(
            "entry belongs to organization {:?}",
            snapshot.organization.slug
        )));
    }
    Ok(snapshot)
}
