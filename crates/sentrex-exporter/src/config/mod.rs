//! Exporter config loader (strict YAML + environment overrides).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use sentrex_core::error::{Result, SentrexError};
use sentrex_core::model::TimeWindow;

pub use schema::{
    CacheSection, ExporterConfig, HttpSection, MetricsSection, RetrySection, SentrySection,
    WindowsSection,
};

/// Env var naming the YAML file.
pub const CONFIG_PATH_ENV: &str = "SENTREX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "sentrex.yaml";

/// Load from `$SENTREX_CONFIG` (or `sentrex.yaml`) plus process env overrides.
pub fn load() -> Result<ExporterConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    load_with(&path, |k| std::env::var(k).ok())
}

/// Load from `path` (missing file allowed) with overrides read through `lookup`.
pub fn load_with<F>(path: &str, lookup: F) -> Result<ExporterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match fs::read_to_string(path) {
        Ok(s) => parse(&s)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found; using defaults and environment");
            ExporterConfig::default()
        }
        Err(e) => return Err(SentrexError::Config(format!("read config failed: {e}"))),
    };
    apply_env(&mut cfg, lookup)?;
    finish(cfg)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    finish(parse(s)?)
}

fn parse(s: &str) -> Result<ExporterConfig> {
    serde_yaml::from_str(s).map_err(|e| SentrexError::Config(format!("invalid yaml: {e}")))
}

fn finish(mut cfg: ExporterConfig) -> Result<ExporterConfig> {
    cfg.normalize();
    cfg.validate()?;
    Ok(cfg)
}

/// Apply the exporter's environment variables on top of `cfg`.
pub fn apply_env<F>(cfg: &mut ExporterConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("SENTRY_API_BASE_URL") {
        cfg.sentry.base_url = v;
    }
    if let Some(v) = get("SENTRY_AUTH_TOKEN") {
        cfg.sentry.auth_token = v;
    }
    if let Some(v) = get("SENTRY_EXPORTER_ORG_SLUG") {
        cfg.sentry.org_slug = v;
    }
    if let Some(v) = get("SENTRY_EXPORTER_PROJECTS") {
        cfg.sentry.projects = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(v) = get("SENTRY_ISSUE_METRICS") {
        cfg.metrics.issues = parse_bool("SENTRY_ISSUE_METRICS", &v)?;
    }
    if let Some(v) = get("SENTRY_EVENTS_METRICS") {
        cfg.metrics.events = parse_bool("SENTRY_EVENTS_METRICS", &v)?;
    }
    if let Some(v) = get("SENTRY_RATE_LIMIT_METRICS") {
        cfg.metrics.rate_limit = parse_bool("SENTRY_RATE_LIMIT_METRICS", &v)?;
    }

    for (key, window) in [
        ("SENTRY_ISSUES_1H", TimeWindow::OneHour),
        ("SENTRY_ISSUES_24H", TimeWindow::OneDay),
        ("SENTRY_ISSUES_14D", TimeWindow::FourteenDays),
    ] {
        if let Some(v) = get(key) {
            cfg.metrics.windows.set(window, parse_bool(key, &v)?);
        }
    }

    if let Some(port) = get("EXPORTER_PORT") {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|e| SentrexError::Config(format!("EXPORTER_PORT {port:?}: {e}")))?;
        let host = cfg
            .http
            .listen
            .rsplit_once(':')
            .map(|(h, _)| h.to_string())
            .unwrap_or_else(|| "0.0.0.0".into());
        cfg.http.listen = format!("{host}:{port}");
    }

    Ok(())
}

/// Boolean spellings accepted by the original exporter's env vars.
pub fn parse_bool(key: &str, v: &str) -> Result<bool> {
    match v.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(SentrexError::Config(format!("{key}: invalid boolean {other:?}"))),
    }
}
