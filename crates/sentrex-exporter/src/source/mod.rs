//! Remote data source seam.
//!
//! The builder and projector only see `RemoteDataSource`. Production wires
//! `Retrying<SentryApi>`; tests plug in fakes.

pub mod retry;
pub mod sentry;

use async_trait::async_trait;

use sentrex_core::error::Result;
use sentrex_core::model::{Issue, Organization, Project, ProjectStats, RateLimit, TimeWindow};

pub use retry::{RetryPolicy, Retrying};
pub use sentry::SentryApi;

/// Result of an issue listing for one (project, environment, window) branch.
///
/// `NoneFound` is a successful answer and is recorded as an empty list.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueListing {
    Found(Vec<Issue>),
    NoneFound,
}

impl IssueListing {
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        if issues.is_empty() {
            IssueListing::NoneFound
        } else {
            IssueListing::Found(issues)
        }
    }

    pub fn into_issues(self) -> Vec<Issue> {
        match self {
            IssueListing::Found(v) => v,
            IssueListing::NoneFound => Vec::new(),
        }
    }
}

/// Logical operations consumed from the project-tracking API.
///
/// Every call may fail; failures are ordinary `Err` values and callers decide
/// how far a failure propagates.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    async fn organization(&self, org_slug: &str) -> Result<Organization>;

    async fn projects(&self, org_slug: &str) -> Result<Vec<Project>>;

    async fn project(&self, org_slug: &str, project_slug: &str) -> Result<Project>;

    async fn environments(&self, org_slug: &str, project: &Project) -> Result<Vec<String>>;

    async fn issues(
        &self,
        org_slug: &str,
        project: &Project,
        environment: &str,
        window: TimeWindow,
    ) -> Result<IssueListing>;

    /// Current release version of an issue; empty when none is known.
    async fn issue_release(&self, issue_id: &str, environment: &str) -> Result<String>;

    async fn project_stats(&self, org_slug: &str, project_slug: &str) -> Result<ProjectStats>;

    /// First client key's rate limit, `None` when no limit is configured.
    async fn rate_limit(&self, org_slug: &str, project_slug: &str) -> Result<Option<RateLimit>>;
}
