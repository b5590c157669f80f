//! Metric samples produced by projection.
//!
//! Family names and label names are a compatibility surface for existing
//! dashboards and must not change.

/// Histogram boundaries for summed open-issue counts.
pub const OPEN_ISSUE_BUCKETS: [f64; 6] = [1.0, 5.0, 10.0, 50.0, 100.0, 500.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    OpenIssuesHistogram,
    OpenIssueEvents,
    Events,
    RateLimit,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Family::OpenIssuesHistogram => "sentry_open_issues_histogram",
            Family::OpenIssueEvents => "sentry_open_issue_events",
            Family::Events => "sentry_events",
            Family::RateLimit => "sentry_rate_limit_events_sec",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Family::OpenIssuesHistogram => {
                "Histogram of open issues (aka is:unresolved) count per project and environment"
            }
            Family::OpenIssueEvents => "Number of open issues (aka is:unresolved) per project",
            Family::Events => "Total events counts per project",
            Family::RateLimit => "Rate limit events per second for a project",
        }
    }

    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            Family::OpenIssuesHistogram => &["project_slug", "environment"],
            Family::OpenIssueEvents => &[
                "issue_id",
                "logger",
                "level",
                "status",
                "platform",
                "project_slug",
                "environment",
                "release",
                "isUnhandled",
                "firstSeen",
                "lastSeen",
            ],
            Family::Events => &["project_slug", "stat"],
            Family::RateLimit => &["project_slug"],
        }
    }
}

/// One observation (histogram), set (gauge) or increment (counter).
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub family: Family,
    /// Values in `family.label_names()` order.
    pub label_values: Vec<String>,
    pub value: f64,
}

impl Sample {
    pub fn new(family: Family, label_values: Vec<String>, value: f64) -> Self {
        debug_assert_eq!(label_values.len(), family.label_names().len());
        Self { family, label_values, value }
    }

    pub fn labels(&self) -> Vec<(&'static str, &str)> {
        self.family
            .label_names()
            .iter()
            .copied()
            .zip(self.label_values.iter().map(String::as_str))
            .collect()
    }

    /// Value of one label by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels().into_iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }
}
