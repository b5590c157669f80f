//! Shared error type across sentrex crates.

use thiserror::Error;

/// Stable error classification (used as a log field and metric label).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or HTTP-level failure talking to the remote API.
    Remote,
    /// A decoded payload had an unexpected field type or was missing a field.
    Shape,
    /// Cached snapshot could not be decoded or had no valid expiration.
    CacheCorruption,
    /// The configured organization could not be resolved.
    OrganizationResolution,
    /// The organization's project list could not be fetched.
    ProjectListing,
    /// Invalid configuration.
    Config,
    /// Local I/O failure.
    Io,
    /// Internal invariant failure.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs and labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Remote => "REMOTE",
            ErrorKind::Shape => "SHAPE",
            ErrorKind::CacheCorruption => "CACHE_CORRUPTION",
            ErrorKind::OrganizationResolution => "ORGANIZATION_RESOLUTION",
            ErrorKind::ProjectListing => "PROJECT_LISTING",
            ErrorKind::Config => "CONFIG",
            ErrorKind::Io => "IO",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SentrexError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum SentrexError {
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("unexpected payload shape: {0}")]
    Shape(String),
    #[error("cache corrupt: {0}")]
    CacheCorruption(String),
    #[error("organization resolution failed: {0}")]
    OrganizationResolution(String),
    #[error("project listing failed: {0}")]
    ProjectListing(String),
    #[error("config: {0}")]
    Config(String),
    #[error("io: {0}")]
    Io(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SentrexError {
    /// Map to a stable kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SentrexError::Remote(_) => ErrorKind::Remote,
            SentrexError::Shape(_) => ErrorKind::Shape,
            SentrexError::CacheCorruption(_) => ErrorKind::CacheCorruption,
            SentrexError::OrganizationResolution(_) => ErrorKind::OrganizationResolution,
            SentrexError::ProjectListing(_) => ErrorKind::ProjectListing,
            SentrexError::Config(_) => ErrorKind::Config,
            SentrexError::Io(_) => ErrorKind::Io,
            SentrexError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a retry of the same remote call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SentrexError::Remote(_))
    }

    /// Fatal for a whole snapshot build (no organization identity or no
    /// project enumeration).
    pub fn is_build_fatal(&self) -> bool {
        matches!(
            self,
            SentrexError::OrganizationResolution(_) | SentrexError::ProjectListing(_)
        )
    }
}

impl From<std::io::Error> for SentrexError {
    fn from(e: std::io::Error) -> Self {
        SentrexError::Io(e.to_string())
    }
}
