use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use sentrex_core::error::{Result, SentrexError};
use sentrex_core::model::{ProjectSelector, TimeWindow, WindowSet};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub sentry: SentrySection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub http: HttpSection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            sentry: SentrySection::default(),
            metrics: MetricsSection::default(),
            cache: CacheSection::default(),
            http: HttpSection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SentrexError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.sentry.validate()?;
        self.cache.validate()?;
        self.http.validate()?;

        Ok(())
    }

    /// Fill in derived defaults that need a warning rather than an error.
    pub fn normalize(&mut self) {
        if !self.sentry.base_url.ends_with('/') {
            self.sentry.base_url.push('/');
        }
        if self.metrics.windows.to_set().is_empty() {
            tracing::warn!("no issue window enabled; enabling 1h");
            self.metrics.windows.one_hour = true;
        }
    }

    pub fn project_selector(&self) -> ProjectSelector {
        ProjectSelector::from_slugs(self.sentry.projects.iter().cloned())
    }

    pub fn windows(&self) -> WindowSet {
        self.metrics.windows.to_set()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SentrySection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub auth_token: String,

    #[serde(default)]
    pub org_slug: String,

    #[serde(default)]
    pub projects: Vec<String>,
}

impl Default for SentrySection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: String::new(),
            org_slug: String::new(),
            projects: Vec::new(),
        }
    }
}

// Token stays out of logs.
impl fmt::Debug for SentrySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentrySection")
            .field("base_url", &self.base_url)
            .field("auth_token", &"<redacted>")
            .field("org_slug", &self.org_slug)
            .field("projects", &self.projects)
            .finish()
    }
}

impl SentrySection {
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.trim().is_empty() {
            return Err(SentrexError::Config("sentry.auth_token must be set".into()));
        }
        if self.org_slug.trim().is_empty() {
            return Err(SentrexError::Config("sentry.org_slug must be set".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SentrexError::Config(
                "sentry.base_url must be an http(s) url".into(),
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://sentry.io/api/0/".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_true")]
    pub issues: bool,

    #[serde(default = "default_true")]
    pub events: bool,

    #[serde(default = "default_true")]
    pub rate_limit: bool,

    #[serde(default)]
    pub windows: WindowsSection,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            issues: true,
            events: true,
            rate_limit: true,
            windows: WindowsSection::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowsSection {
    #[serde(rename = "1h", default)]
    pub one_hour: bool,

    #[serde(rename = "24h", default)]
    pub one_day: bool,

    #[serde(rename = "14d", default)]
    pub fourteen_days: bool,
}

impl Default for WindowsSection {
    fn default() -> Self {
        Self {
            one_hour: false,
            one_day: true,
            fourteen_days: false,
        }
    }
}

impl WindowsSection {
    pub fn to_set(&self) -> WindowSet {
        WindowSet::new(self.one_hour, self.one_day, self.fourteen_days)
    }

    pub fn set(&mut self, window: TimeWindow, enabled: bool) {
        match window {
            TimeWindow::OneHour => self.one_hour = enabled,
            TimeWindow::OneDay => self.one_day = enabled,
            TimeWindow::FourteenDays => self.fourteen_days = enabled,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default = "default_cache_path")]
    pub path: String,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// One year.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

impl CacheSection {
    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(SentrexError::Config("cache.ttl_secs must be greater than 0".into()));
        }
        if self.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(SentrexError::Config(format!(
                "cache.ttl_secs must be at most {MAX_CACHE_TTL_SECS}"
            )));
        }
        if self.path.trim().is_empty() {
            return Err(SentrexError::Config("cache.path must not be empty".into()));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_cache_path() -> String {
    "./sentry-collector-exporter-cache.json".into()
}
fn default_ttl_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            request_timeout_ms: default_request_timeout_ms(),
            retry: RetrySection::default(),
        }
    }
}

impl HttpSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=120_000).contains(&self.request_timeout_ms) {
            return Err(SentrexError::Config(
                "http.request_timeout_ms must be between 100 and 120000".into(),
            ));
        }
        self.retry.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.max_attempts) {
            return Err(SentrexError::Config(
                "http.retry.max_attempts must be between 1 and 10".into(),
            ));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(SentrexError::Config(
                "http.retry.max_delay_ms must not be below initial_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    2_000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_true() -> bool {
    true
}
