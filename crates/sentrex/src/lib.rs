//! Top-level facade crate for sentrex.
//!
//! Re-exports the core model and the exporter library so users can depend on a single crate.

pub mod core {
    pub use sentrex_core::*;
}

pub mod exporter {
    pub use sentrex_exporter::*;
}
