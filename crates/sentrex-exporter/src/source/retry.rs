//! Bounded retry with doubling backoff, applied as a data-source decorator.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use sentrex_core::error::Result;
use sentrex_core::model::{Organization, Project, ProjectStats, RateLimit, TimeWindow};

use super::{IssueListing, RemoteDataSource};
use crate::config::RetrySection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySection::default())
    }
}

impl From<&RetrySection> for RetryPolicy {
    fn from(s: &RetrySection) -> Self {
        Self {
            max_attempts: s.max_attempts.max(1),
            initial_delay: Duration::from_millis(s.initial_delay_ms),
            max_delay: Duration::from_millis(s.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based), doubling up to `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `f` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    pub async fn run<T, F, Fut>(&self, op: &'static str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(op, attempt, ?delay, error = %e, "remote call failed; retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Wraps any source so every call goes through a `RetryPolicy`.
pub struct Retrying<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> Retrying<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RemoteDataSource> RemoteDataSource for Retrying<S> {
    async fn organization(&self, org_slug: &str) -> Result<Organization> {
        self.policy
            .run("organization", || self.inner.organization(org_slug))
            .await
    }

    async fn projects(&self, org_slug: &str) -> Result<Vec<Project>> {
        self.policy.run("projects", || self.inner.projects(org_slug)).await
    }

    async fn project(&self, org_slug: &str, project_slug: &str) -> Result<Project> {
        self.policy
            .run("project", || self.inner.project(org_slug, project_slug))
            .await
    }

    async fn environments(&self, org_slug: &str, project: &Project) -> Result<Vec<String>> {
        self.policy
            .run("environments", || self.inner.environments(org_slug, project))
            .await
    }

    async fn issues(
        &self,
        org_slug: &str,
        project: &Project,
        environment: &str,
        window: TimeWindow,
    ) -> Result<IssueListing> {
        self.policy
            .run("issues", || self.inner.issues(org_slug, project, environment, window))
            .await
    }

    async fn issue_release(&self, issue_id: &str, environment: &str) -> Result<String> {
        self.policy
            .run("issue_release", || self.inner.issue_release(issue_id, environment))
            .await
    }

    async fn project_stats(&self, org_slug: &str, project_slug: &str) -> Result<ProjectStats> {
        self.policy
            .run("project_stats", || self.inner.project_stats(org_slug, project_slug))
            .await
    }

    async fn rate_limit(&self, org_slug: &str, project_slug: &str) -> Result<Option<RateLimit>> {
        self.policy
            .run("rate_limit", || self.inner.rate_limit(org_slug, project_slug))
            .await
    }
}
