//! Project event statistics and key rate limits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Stat names queried per project, in emission order.
pub const STAT_NAMES: [&str; 3] = ["received", "rejected", "blacklisted"];

/// Month-to-date event totals keyed by stat name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectStats {
    totals: BTreeMap<String, u64>,
}

impl ProjectStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stat: &str, count: u64) {
        let total = self.totals.entry(stat.to_string()).or_insert(0);
        *total = total.saturating_add(count);
    }

    pub fn get(&self, stat: &str) -> Option<u64> {
        self.totals.get(stat).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.totals.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Client key rate limit: `count` events per `window` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RateLimit {
    pub count: f64,
    pub window: f64,
}

impl RateLimit {
    /// Events per second; zero when the window is zero.
    pub fn per_second(&self) -> f64 {
        if self.window == 0.0 {
            0.0
        } else {
            self.count / self.window
        }
    }

    /// Rate of an optional limit; absent limits are zero.
    pub fn rate_of(limit: Option<RateLimit>) -> f64 {
        limit.map(|l| l.per_second()).unwrap_or(0.0)
    }
}
