//! The snapshot tree: organization -> projects -> environments -> windows -> issues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Issue, Organization, Project, TimeWindow};

/// Issues of one project keyed by environment then window.
pub type EnvironmentIssues = BTreeMap<String, BTreeMap<TimeWindow, Vec<Issue>>>;

/// Point-in-time assembled tree.
///
/// Presence is structural: a project with no entry in `environments` had its
/// environment fetch fail, a window with no entry under an environment had its
/// issue fetch fail (or was disabled). A present but empty issue list means
/// Sentry answered "no issues".
///
/// Field names double as the persisted cache layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "org")]
    pub organization: Organization,
    pub projects: Vec<Project>,
    #[serde(rename = "projects_envs", default)]
    environments: BTreeMap<String, Vec<String>>,
    #[serde(rename = "projects_data", default)]
    issues: BTreeMap<String, EnvironmentIssues>,
    /// Absolute expiry, seconds since the unix epoch. Zero until stamped by
    /// the cache.
    pub expire_at: i64,
}

impl Snapshot {
    pub fn new(organization: Organization) -> Self {
        Self {
            organization,
            projects: Vec::new(),
            environments: BTreeMap::new(),
            issues: BTreeMap::new(),
            expire_at: 0,
        }
    }

    pub fn push_project(&mut self, project: Project) {
        self.projects.push(project);
    }

    pub fn project_slugs(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(|p| p.slug.as_str())
    }

    pub fn set_environments(&mut self, project_slug: &str, envs: Vec<String>) {
        self.environments.insert(project_slug.to_string(), envs);
    }

    /// Environments of a project, `None` when the fetch failed.
    pub fn environments(&self, project_slug: &str) -> Option<&[String]> {
        self.environments.get(project_slug).map(Vec::as_slice)
    }

    /// Record one window's issues. Intermediate levels are created on first
    /// use and left intact afterwards.
    pub fn record_issues(
        &mut self,
        project_slug: &str,
        environment: &str,
        window: TimeWindow,
        issues: Vec<Issue>,
    ) {
        self.issues
            .entry(project_slug.to_string())
            .or_default()
            .entry(environment.to_string())
            .or_default()
            .insert(window, issues);
    }

    /// Issues of one branch, `None` when absent.
    pub fn window_issues(
        &self,
        project_slug: &str,
        environment: &str,
        window: TimeWindow,
    ) -> Option<&[Issue]> {
        self.issues
            .get(project_slug)?
            .get(environment)?
            .get(&window)
            .map(Vec::as_slice)
    }

    pub fn project_issues(&self, project_slug: &str) -> Option<&EnvironmentIssues> {
        self.issues.get(project_slug)
    }

    /// `now < expire_at`.
    pub fn is_fresh_at(&self, now: i64) -> bool {
        now < self.expire_at
    }
}
