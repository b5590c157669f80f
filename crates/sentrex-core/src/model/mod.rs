//! Typed snapshot model.
//!
//! - `org`: organization / project metadata and project selection
//! - `window`: the fixed lookback windows
//! - `issue`: issue records and count normalization
//! - `stats`: per-project event totals and rate limits
//! - `snapshot`: the assembled tree

pub mod issue;
pub mod org;
pub mod snapshot;
pub mod stats;
pub mod window;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use issue::{normalize_count_value, Issue, IssueCount};
pub use org::{OrgStatus, Organization, Project, ProjectSelector};
pub use snapshot::{EnvironmentIssues, Snapshot};
pub use stats::{ProjectStats, RateLimit, STAT_NAMES};
pub use window::{TimeWindow, WindowSet};

/// Decode any JSON scalar as label text; `null` becomes empty.
pub(crate) fn opaque_text<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
