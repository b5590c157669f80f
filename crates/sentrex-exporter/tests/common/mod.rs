#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

//! In-memory Sentry stand-in with failure injection and call counters.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use sentrex_core::error::{Result, SentrexError};
use sentrex_core::model::{
    Issue, IssueCount, Organization, Project, ProjectStats, RateLimit, TimeWindow,
};
use sentrex_exporter::config::ExporterConfig;
use sentrex_exporter::source::{IssueListing, RemoteDataSource};

pub type Branch = (String, String, TimeWindow);

#[derive(Default)]
pub struct FakeState {
    pub org: Option<Organization>,
    /// Remaining organization calls that fail before one succeeds.
    pub org_failures: u32,
    pub org_delay: Option<Duration>,
    pub projects: Vec<Project>,
    pub fail_listing: bool,
    pub fail_projects: HashSet<String>,
    pub envs: HashMap<String, Vec<String>>,
    pub fail_envs: HashSet<String>,
    pub issues: HashMap<Branch, Vec<Issue>>,
    pub fail_issues: HashSet<Branch>,
    pub releases: HashMap<String, String>,
    pub fail_releases: HashSet<String>,
    pub stats: HashMap<String, ProjectStats>,
    pub fail_stats: HashSet<String>,
    pub rate_limits: HashMap<String, RateLimit>,
    pub fail_rate_limits: HashSet<String>,
}

#[derive(Default)]
pub struct FakeSource {
    state: Mutex<FakeState>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeSource {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn hit(&self, op: &'static str) {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
    }
}

fn remote(what: impl std::fmt::Display) -> SentrexError {
    SentrexError::Remote(format!("injected failure: {what}"))
}

#[async_trait]
impl RemoteDataSource for FakeSource {
    async fn organization(&self, org_slug: &str) -> Result<Organization> {
        self.hit("organization");
        let delay = self.with(|s| s.org_delay);
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        self.with(|s| {
            if s.org_failures > 0 {
                s.org_failures -= 1;
                return Err(remote("organization"));
            }
            match &s.org {
                Some(o) if o.slug == org_slug => Ok(o.clone()),
                _ => Err(remote(format!("organization {org_slug}"))),
            }
        })
    }

    async fn projects(&self, _org_slug: &str) -> Result<Vec<Project>> {
        self.hit("projects");
        self.with(|s| {
            if s.fail_listing {
                Err(remote("projects"))
            } else {
                Ok(s.projects.clone())
            }
        })
    }

    async fn project(&self, _org_slug: &str, project_slug: &str) -> Result<Project> {
        self.hit("project");
        self.with(|s| {
            if s.fail_projects.contains(project_slug) {
                return Err(remote(project_slug));
            }
            s.projects
                .iter()
                .find(|p| p.slug == project_slug)
                .cloned()
                .ok_or_else(|| remote(format!("unknown project {project_slug}")))
        })
    }

    async fn environments(&self, _org_slug: &str, project: &Project) -> Result<Vec<String>> {
        self.hit("environments");
        self.with(|s| {
            if s.fail_envs.contains(&project.slug) {
                Err(remote(&project.slug))
            } else {
                Ok(s.envs.get(&project.slug).cloned().unwrap_or_default())
            }
        })
    }

    async fn issues(
        &self,
        _org_slug: &str,
        project: &Project,
        environment: &str,
        window: TimeWindow,
    ) -> Result<IssueListing> {
        self.hit("issues");
        let key = (project.slug.clone(), environment.to_string(), window);
        self.with(|s| {
            if s.fail_issues.contains(&key) {
                return Err(remote(format!("{}/{}/{}", key.0, key.1, window)));
            }
            Ok(IssueListing::from_issues(
                s.issues.get(&key).cloned().unwrap_or_default(),
            ))
        })
    }

    async fn issue_release(&self, issue_id: &str, _environment: &str) -> Result<String> {
        self.hit("issue_release");
        self.with(|s| {
            if s.fail_releases.contains(issue_id) {
                Err(remote(issue_id))
            } else {
                Ok(s.releases.get(issue_id).cloned().unwrap_or_default())
            }
        })
    }

    async fn project_stats(&self, _org_slug: &str, project_slug: &str) -> Result<ProjectStats> {
        self.hit("project_stats");
        self.with(|s| {
            if s.fail_stats.contains(project_slug) {
                Err(remote(project_slug))
            } else {
                Ok(s.stats.get(project_slug).cloned().unwrap_or_default())
            }
        })
    }

    async fn rate_limit(&self, _org_slug: &str, project_slug: &str) -> Result<Option<RateLimit>> {
        self.hit("rate_limit");
        self.with(|s| {
            if s.fail_rate_limits.contains(project_slug) {
                Err(remote(project_slug))
            } else {
                Ok(s.rate_limits.get(project_slug).copied())
            }
        })
    }
}

pub fn org(slug: &str) -> Organization {
    Organization {
        id: "1".into(),
        slug: slug.into(),
        name: slug.to_uppercase(),
        status: Default::default(),
    }
}

pub fn project(id: &str, slug: &str) -> Project {
    Project {
        id: id.into(),
        slug: slug.into(),
        name: slug.into(),
        status: "active".into(),
        platform: "rust".into(),
    }
}

pub fn issue(id: &str, count: impl Into<IssueCount>) -> Issue {
    Issue {
        id: id.into(),
        logger: String::new(),
        level: "error".into(),
        status: "unresolved".into(),
        platform: "rust".into(),
        count: count.into(),
        is_unhandled: Some(true),
        first_seen: "2024-05-01T10:00:00Z".into(),
        last_seen: "2024-05-02T10:00:00Z".into(),
    }
}

pub fn branch(project: &str, env: &str, window: TimeWindow) -> Branch {
    (project.into(), env.into(), window)
}

/// Org `acme` with projects `api` and `web`, each in `production`, 24h only.
pub fn two_project_state() -> FakeState {
    let mut s = FakeState {
        org: Some(org("acme")),
        projects: vec![project("11", "api"), project("12", "web")],
        ..Default::default()
    };
    for slug in ["api", "web"] {
        s.envs.insert(slug.into(), vec!["production".into()]);
    }
    s.issues.insert(
        branch("api", "production", TimeWindow::OneDay),
        vec![issue("101", 10u64), issue("102", "5")],
    );
    s.issues.insert(
        branch("web", "production", TimeWindow::OneDay),
        vec![issue("201", 3u64)],
    );
    s
}

/// Valid config for org `acme` with the default 24h window.
pub fn config() -> ExporterConfig {
    let mut cfg = ExporterConfig::default();
    cfg.sentry.auth_token = "test-token".into();
    cfg.sentry.org_slug = "acme".into();
    cfg
}
