//! Snapshot assembly.
//!
//! Walks organization -> projects -> environments -> windows -> issues.
//! Only two failures abort a build: the organization lookup and, when no
//! projects are named, the project listing. Everything below that is skipped
//! per branch and the rest of the tree is still assembled.

use std::sync::Arc;

use sentrex_core::error::{Result, SentrexError};
use sentrex_core::model::{Organization, Project, ProjectSelector, Snapshot, WindowSet};

use crate::config::ExporterConfig;
use crate::source::RemoteDataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Fetch issue lists at all.
    pub issues: bool,
    pub windows: WindowSet,
}

impl BuildOptions {
    pub fn from_config(cfg: &ExporterConfig) -> Self {
        Self {
            issues: cfg.metrics.issues,
            windows: cfg.windows(),
        }
    }
}

pub struct SnapshotBuilder {
    source: Arc<dyn RemoteDataSource>,
    opts: BuildOptions,
}

impl SnapshotBuilder {
    pub fn new(source: Arc<dyn RemoteDataSource>, opts: BuildOptions) -> Self {
        Self { source, opts }
    }

    /// Build a fresh snapshot. The result is unstamped (`expire_at == 0`).
    pub async fn build(&self, org_slug: &str, selector: &ProjectSelector) -> Result<Snapshot> {
        let organization = self
            .source
            .organization(org_slug)
            .await
            .map_err(|e| SentrexError::OrganizationResolution(format!("{org_slug}: {e}")))?;
        tracing::info!(org = %organization.slug, "snapshot: organization resolved");

        let projects = self.resolve_projects(&organization, selector).await?;
        let org_slug = organization.slug.clone();
        let mut snapshot = Snapshot::new(organization);
        let mut skipped = 0usize;

        for project in projects {
            skipped += self.populate_project(&mut snapshot, &org_slug, &project).await;
            snapshot.push_project(project);
        }

        tracing::info!(
            org = %org_slug,
            projects = snapshot.projects.len(),
            skipped_branches = skipped,
            "snapshot: built"
        );
        Ok(snapshot)
    }

    async fn resolve_projects(
        &self,
        org: &Organization,
        selector: &ProjectSelector,
    ) -> Result<Vec<Project>> {
        match selector {
            ProjectSelector::Named(slugs) => {
                tracing::info!(count = slugs.len(), "snapshot: projects specified");
                let mut projects = Vec::with_capacity(slugs.len());
                for slug in slugs {
                    match self.source.project(&org.slug, slug).await {
                        Ok(p) => projects.push(p),
                        Err(e) => {
                            tracing::warn!(project = %slug, kind = e.kind().as_str(), error = %e, "snapshot: skipping project");
                        }
                    }
                }
                Ok(projects)
            }
            ProjectSelector::All => {
                tracing::info!("snapshot: no projects specified, listing organization");
                self.source
                    .projects(&org.slug)
                    .await
                    .map_err(|e| SentrexError::ProjectListing(format!("{}: {e}", org.slug)))
            }
        }
    }

    /// Fill environments and issue windows for one project. Returns the
    /// number of branches skipped.
    async fn populate_project(&self, snapshot: &mut Snapshot, org_slug: &str, project: &Project) -> usize {
        let envs = match self.source.environments(org_slug, project).await {
            Ok(envs) => envs,
            Err(e) => {
                tracing::warn!(project = %project.slug, kind = e.kind().as_str(), error = %e, "snapshot: environments unavailable");
                return 1;
            }
        };
        snapshot.set_environments(&project.slug, envs.clone());

        if !self.opts.issues {
            return 0;
        }

        let mut skipped = 0;
        for env in &envs {
            for window in self.opts.windows.iter() {
                tracing::debug!(project = %project.slug, %env, %window, "snapshot: fetching issues");
                match self.source.issues(org_slug, project, env, window).await {
                    Ok(listing) => {
                        snapshot.record_issues(&project.slug, env, window, listing.into_issues())
                    }
                    Err(e) => {
                        skipped += 1;
                        tracing::warn!(
                            project = %project.slug,
                            %env,
                            %window,
                            kind = e.kind().as_str(),
                            error = %e,
                            "snapshot: issues unavailable"
                        );
                    }
                }
            }
        }
        skipped
    }
}
