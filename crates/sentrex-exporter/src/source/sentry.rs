//! Sentry web API client.
//!
//! Single-attempt calls; retries are layered on by `Retrying`. Paths are
//! relative to the configured base URL (e.g. `https://sentry.io/api/0/`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, TimeZone, Utc};
use futures_util::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use sentrex_core::error::{Result, SentrexError};
use sentrex_core::model::{
    normalize_count_value, Issue, Organization, Project, ProjectStats, RateLimit, TimeWindow,
    STAT_NAMES,
};

use super::{IssueListing, RemoteDataSource};
use crate::config::ExporterConfig;

pub struct SentryApi {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EnvironmentEntry {
    name: String,
}

impl SentryApi {
    pub fn new(base_url: &str, auth_token: &str, timeout: Duration) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {auth_token}"))
            .map_err(|e| SentrexError::Config(format!("auth token is not a valid header: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!("sentrex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SentrexError::Internal(format!("http client build failed: {e}")))?;

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { base_url, client })
    }

    pub fn from_config(cfg: &ExporterConfig) -> Result<Self> {
        Self::new(
            &cfg.sentry.base_url,
            &cfg.sentry.auth_token,
            cfg.http.request_timeout(),
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%path, "GET");

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SentrexError::Remote(format!("GET {path}: {e}")))?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(SentrexError::Remote(format!("GET {path}: HTTP {status}")));
        }

        resp.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                SentrexError::Shape(format!("GET {path}: {e}"))
            } else {
                SentrexError::Remote(format!("GET {path}: {e}"))
            }
        })
    }

    /// Organizations visible to the token (startup probe).
    pub async fn organizations(&self) -> Result<Vec<Organization>> {
        self.get_json("organizations/", &[]).await
    }

    async fn stat_points(
        &self,
        org_slug: &str,
        project_slug: &str,
        stat: &'static str,
        since: i64,
        until: i64,
    ) -> Result<(&'static str, Vec<Value>)> {
        let points: Vec<Value> = self
            .get_json(
                &format!("projects/{org_slug}/{project_slug}/stats/"),
                &[
                    ("stat", stat.to_string()),
                    ("since", since.to_string()),
                    ("until", until.to_string()),
                ],
            )
            .await?;
        Ok((stat, points))
    }
}

#[async_trait]
impl RemoteDataSource for SentryApi {
    async fn organization(&self, org_slug: &str) -> Result<Organization> {
        self.get_json(&format!("organizations/{org_slug}/"), &[]).await
    }

    async fn projects(&self, org_slug: &str) -> Result<Vec<Project>> {
        self.get_json(
            &format!("organizations/{org_slug}/projects/"),
            &[("all_projects", "1".to_string())],
        )
        .await
    }

    async fn project(&self, org_slug: &str, project_slug: &str) -> Result<Project> {
        self.get_json(&format!("projects/{org_slug}/{project_slug}/"), &[])
            .await
    }

    async fn environments(&self, org_slug: &str, project: &Project) -> Result<Vec<String>> {
        let envs: Vec<EnvironmentEntry> = self
            .get_json(&format!("projects/{org_slug}/{}/environments/", project.slug), &[])
            .await?;
        Ok(envs.into_iter().map(|e| e.name).collect())
    }

    async fn issues(
        &self,
        org_slug: &str,
        project: &Project,
        environment: &str,
        window: TimeWindow,
    ) -> Result<IssueListing> {
        let mut query = vec![
            ("project", project.id.clone()),
            ("sort", "date".to_string()),
            ("query", format!("age:-{window}")),
        ];
        if !environment.is_empty() {
            query.push(("environment", environment.to_string()));
        }

        let raw: Vec<Value> = self
            .get_json(&format!("projects/{org_slug}/{}/issues/", project.slug), &query)
            .await?;
        Ok(IssueListing::from_issues(decode_issues(raw)))
    }

    async fn issue_release(&self, issue_id: &str, environment: &str) -> Result<String> {
        let mut query = Vec::new();
        if !environment.is_empty() {
            query.push(("environment", environment.to_string()));
        }
        let body: Value = self
            .get_json(&format!("issues/{issue_id}/current-release/"), &query)
            .await?;
        Ok(release_version(&body))
    }

    async fn project_stats(&self, org_slug: &str, project_slug: &str) -> Result<ProjectStats> {
        let until = Utc::now();
        let since = Utc
            .with_ymd_and_hms(until.year(), until.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(until);

        let fetched = try_join_all(STAT_NAMES.iter().map(|stat| {
            self.stat_points(org_slug, project_slug, *stat, since.timestamp(), until.timestamp())
        }))
        .await?;

        let mut stats = ProjectStats::new();
        for (stat, points) in fetched {
            stats.add(stat, sum_stat_points(project_slug, stat, &points));
        }
        Ok(stats)
    }

    async fn rate_limit(&self, org_slug: &str, project_slug: &str) -> Result<Option<RateLimit>> {
        let keys: Vec<Value> = self
            .get_json(&format!("projects/{org_slug}/{project_slug}/keys/"), &[])
            .await?;
        rate_limit_from_keys(&keys)
    }
}

/// Decode issues one by one so a single malformed entry is skipped alone.
fn decode_issues(raw: Vec<Value>) -> Vec<Issue> {
    raw.into_iter()
        .filter_map(|v| match serde_json::from_value::<Issue>(v) {
            Ok(issue) => Some(issue),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable issue");
                None
            }
        })
        .collect()
}

/// `currentRelease.release.version`, empty when Sentry has none.
fn release_version(body: &Value) -> String {
    body.pointer("/currentRelease/release/version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Sum `[timestamp, count]` points; malformed points are skipped.
fn sum_stat_points(project_slug: &str, stat: &str, points: &[Value]) -> u64 {
    points
        .iter()
        .filter_map(|p| {
            let res = p
                .get(1)
                .ok_or_else(|| SentrexError::Shape("stat point has no count".into()))
                .and_then(normalize_count_value);
            match res {
                Ok(n) => Some(n),
                Err(e) => {
                    tracing::warn!(project = %project_slug, stat, error = %e, "skipping stat point");
                    None
                }
            }
        })
        .fold(0u64, u64::saturating_add)
}

/// First key's `rateLimit`; `None` when there are no keys, no limit, or
/// a missing or null `count`/`window`. A present non-numeric field is a
/// shape error.
fn rate_limit_from_keys(keys: &[Value]) -> Result<Option<RateLimit>> {
    let Some(limit) = keys.first().and_then(|k| k.get("rateLimit")) else {
        return Ok(None);
    };
    if limit.is_null() {
        return Ok(None);
    }
    let field = |name: &str| -> Result<Option<f64>> {
        match limit.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| SentrexError::Shape(format!("rateLimit.{name} is not a number"))),
        }
    };
    let (count, window) = (field("count")?, field("window")?);
    Ok(count.zip(window).map(|(count, window)| RateLimit { count, window }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stat_points_sum_and_skip_bad_entries() {
        let points = vec![json!([1714521600, 10]), json!([1714525200, "5"]), json!([1714528800]), json!([1714532400, null])];
        assert_eq!(sum_stat_points("api", "received", &points), 15);
    }

    #[test]
    fn stat_points_saturate_instead_of_overflowing() {
        let points = vec![json!([1714521600, u64::MAX]), json!([1714525200, u64::MAX])];
        assert_eq!(sum_stat_points("api", "received", &points), u64::MAX);
    }

    #[test]
    fn rate_limit_from_first_key() {
        let keys = vec![json!({ "rateLimit": { "window": 60, "count": 1200 } }), json!({ "rateLimit": null })];
        let limit = rate_limit_from_keys(&keys).ok().flatten();
        assert_eq!(limit.map(|l| l.per_second()), Some(20.0));

        assert_eq!(rate_limit_from_keys(&[json!({ "rateLimit": null })]).ok(), Some(None));
        assert_eq!(rate_limit_from_keys(&[]).ok(), Some(None));
        assert!(rate_limit_from_keys(&[json!({ "rateLimit": { "window": "x", "count": 1 } })]).is_err());
    }

    #[test]
    fn missing_or_null_rate_fields_mean_no_limit() {
        let missing = [json!({ "rateLimit": { "count": 100 } })];
        assert_eq!(rate_limit_from_keys(&missing).ok(), Some(None));

        let nulls = [json!({ "rateLimit": { "window": null, "count": null } })];
        assert_eq!(rate_limit_from_keys(&nulls).ok(), Some(None));
        assert_eq!(RateLimit::rate_of(rate_limit_from_keys(&nulls).ok().flatten()), 0.0);
    }

    #[test]
    fn release_defaults_to_empty() {
        let body = json!({ "currentRelease": { "release": { "version": "api@1.4.2" } } });
        assert_eq!(release_version(&body), "api@1.4.2");
        assert_eq!(release_version(&json!({ "currentRelease": null })), "");
    }

    #[test]
    fn malformed_issue_entries_are_dropped_individually() {
        let raw = vec![json!({ "id": "1", "count": "3" }), json!({ "count": 2 }), json!("junk")];
        let issues = decode_issues(raw);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "1");
    }
}
