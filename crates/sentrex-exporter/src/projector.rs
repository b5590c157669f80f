//! Snapshot -> metric samples.
//!
//! Read-only over the snapshot. Release, stats and rate-limit lookups go to
//! the data source during projection; each failure drops only the sample it
//! would have produced.

use std::collections::HashMap;
use std::sync::Arc;

use sentrex_core::model::{Issue, Project, RateLimit, Snapshot, WindowSet};

use crate::config::ExporterConfig;
use crate::obs::{Family, Sample};
use crate::source::RemoteDataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionOptions {
    pub issues: bool,
    pub events: bool,
    pub rate_limit: bool,
    pub windows: WindowSet,
}

impl ProjectionOptions {
    pub fn from_config(cfg: &ExporterConfig) -> Self {
        Self {
            issues: cfg.metrics.issues,
            events: cfg.metrics.events,
            rate_limit: cfg.metrics.rate_limit,
            windows: cfg.windows(),
        }
    }
}

pub struct MetricProjector {
    source: Arc<dyn RemoteDataSource>,
    opts: ProjectionOptions,
}

/// Per-issue gauge samples keyed by label values; a repeat label set
/// overwrites the earlier value.
#[derive(Default)]
struct IssueGauges {
    index: HashMap<Vec<String>, usize>,
    samples: Vec<Sample>,
}

impl IssueGauges {
    fn set(&mut self, label_values: Vec<String>, value: f64) {
        match self.index.get(&label_values) {
            Some(&i) => self.samples[i].value = value,
            None => {
                self.index.insert(label_values.clone(), self.samples.len());
                self.samples.push(Sample::new(Family::OpenIssueEvents, label_values, value));
            }
        }
    }
}

impl MetricProjector {
    pub fn new(source: Arc<dyn RemoteDataSource>, opts: ProjectionOptions) -> Self {
        Self { source, opts }
    }

    pub async fn project(&self, snapshot: &Snapshot) -> Vec<Sample> {
        let org_slug = snapshot.organization.slug.as_str();
        let projects: Vec<&Project> = snapshot
            .projects
            .iter()
            .filter(|p| {
                let present = snapshot.environments(&p.slug).is_some();
                if !present {
                    tracing::warn!(project = %p.slug, "collector: project has no environment data; skipping");
                }
                present
            })
            .collect();

        let mut samples = Vec::new();
        if self.opts.issues {
            self.project_issue_histogram(snapshot, &projects, &mut samples);
            self.project_issue_gauges(snapshot, &projects, &mut samples).await;
        }
        if self.opts.events {
            self.project_events(org_slug, &projects, &mut samples).await;
        }
        if self.opts.rate_limit {
            self.project_rate_limits(org_slug, &projects, &mut samples).await;
        }

        tracing::debug!(samples = samples.len(), "collector: projection done");
        samples
    }

    /// One observation per present (project, environment, window) branch.
    fn project_issue_histogram(&self, snapshot: &Snapshot, projects: &[&Project], out: &mut Vec<Sample>) {
        for project in projects {
            let envs = snapshot.environments(&project.slug).unwrap_or_default();
            for env in envs {
                for window in self.opts.windows.iter() {
                    let Some(issues) = snapshot.window_issues(&project.slug, env, window) else {
                        tracing::debug!(project = %project.slug, %env, %window, "collector: no issue data");
                        continue;
                    };
                    let total = sum_counts(&project.slug, env, issues);
                    out.push(Sample::new(
                        Family::OpenIssuesHistogram,
                        vec![project.slug.clone(), env.clone()],
                        total as f64,
                    ));
                }
            }
        }
    }

    async fn project_issue_gauges(&self, snapshot: &Snapshot, projects: &[&Project], out: &mut Vec<Sample>) {
        let mut gauges = IssueGauges::default();
        // (issue, environment) -> release; `None` marks a failed lookup.
        let mut releases: HashMap<(String, String), Option<String>> = HashMap::new();

        for project in projects {
            let envs = snapshot.environments(&project.slug).unwrap_or_default();
            for env in envs {
                for window in self.opts.windows.iter() {
                    let Some(issues) = snapshot.window_issues(&project.slug, env, window) else {
                        continue;
                    };
                    for issue in issues {
                        let count = match issue.count.normalize() {
                            Ok(c) => c,
                            Err(e) => {
                                tracing::warn!(project = %project.slug, %env, issue = %issue.id, error = %e, "collector: skipping issue gauge");
                                continue;
                            }
                        };

                        let key = (issue.id.clone(), env.clone());
                        let release = match releases.get(&key) {
                            Some(cached) => cached.clone(),
                            None => {
                                let fetched = match self.source.issue_release(&issue.id, env).await {
                                    Ok(r) => Some(r),
                                    Err(e) => {
                                        tracing::warn!(issue = %issue.id, %env, kind = e.kind().as_str(), error = %e, "collector: release lookup failed");
                                        None
                                    }
                                };
                                releases.insert(key, fetched.clone());
                                fetched
                            }
                        };
                        let Some(release) = release else { continue };

                        gauges.set(issue_labels(issue, &project.slug, env, release), count as f64);
                    }
                }
            }
        }

        out.extend(gauges.samples);
    }

    async fn project_events(&self, org_slug: &str, projects: &[&Project], out: &mut Vec<Sample>) {
        for project in projects {
            match self.source.project_stats(org_slug, &project.slug).await {
                Ok(stats) => {
                    for (stat, n) in stats.iter() {
                        out.push(Sample::new(
                            Family::Events,
                            vec![project.slug.clone(), stat.to_string()],
                            n as f64,
                        ));
                    }
                }
                Err(e) => {
                    tracing::warn!(project = %project.slug, kind = e.kind().as_str(), error = %e, "collector: project stats unavailable");
                }
            }
        }
    }

    async fn project_rate_limits(&self, org_slug: &str, projects: &[&Project], out: &mut Vec<Sample>) {
        for project in projects {
            match self.source.rate_limit(org_slug, &project.slug).await {
                Ok(limit) => out.push(Sample::new(
                    Family::RateLimit,
                    vec![project.slug.clone()],
                    RateLimit::rate_of(limit),
                )),
                Err(e) => {
                    tracing::warn!(project = %project.slug, kind = e.kind().as_str(), error = %e, "collector: rate limit unavailable");
                }
            }
        }
    }
}

/// Sum normalized counts; unusable counts are skipped individually.
fn sum_counts(project_slug: &str, env: &str, issues: &[Issue]) -> u64 {
    issues
        .iter()
        .filter_map(|issue| match issue.count.normalize() {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(project = %project_slug, %env, issue = %issue.id, error = %e, "collector: skipping issue count");
                None
            }
        })
        .fold(0u64, u64::saturating_add)
}

fn issue_labels(issue: &Issue, project_slug: &str, env: &str, release: String) -> Vec<String> {
    vec![
        issue.id.clone(),
        issue.logger.clone(),
        issue.level.clone(),
        issue.status.clone(),
        issue.platform.clone(),
        project_slug.to_string(),
        env.to_string(),
        release,
        issue.unhandled_label().to_string(),
        issue.first_seen.clone(),
        issue.last_seen.clone(),
    ]
}
