//! sentrex core: the typed snapshot model and error surface.
//!
//! This crate defines the data shapes shared by the exporter's builder,
//! cache and projector. It carries no HTTP or runtime dependencies so the
//! model can be exercised in isolation.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed remote
//! data must surface as `SentrexError`/`Result`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;

/// Shared result type.
pub use error::{ErrorKind, Result, SentrexError};
