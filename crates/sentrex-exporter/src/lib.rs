//! Sentry exporter library entry.
//!
//! Wires the Sentry data source, the snapshot builder and cache, and the
//! metric projector into an HTTP exporter. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod builder;
pub mod cache;
pub mod collector;
pub mod config;
pub mod obs;
pub mod ops;
pub mod projector;
pub mod router;
pub mod source;
