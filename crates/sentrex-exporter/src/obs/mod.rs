//! In-process metrics.
//!
//! `sample` defines the exported families; `metrics` holds the label-keyed
//! counter/gauge/histogram vectors and renders the Prometheus text format.

pub mod metrics;
pub mod sample;

pub use metrics::{ExporterMetrics, SentryMetrics};
pub use sample::{Family, Sample, OPEN_ISSUE_BUCKETS};
