//! Snapshot persistence.
//!
//! `SnapshotStore` moves bytes; `SnapshotCache` owns the encoding and the
//! expiration policy. Every failure on the read path is a miss.

pub mod snapshot_cache;
pub mod store;

pub use snapshot_cache::{unix_now, CacheLookup, MissReason, SnapshotCache};
pub use store::{FileStore, MemoryStore, SnapshotStore};
