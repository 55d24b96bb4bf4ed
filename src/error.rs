//! Error taxonomy for the harvest pipeline

use std::fmt;
use thiserror::Error;

/// Why a probe through a candidate did not come back with HTTP 200
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProbeErrorKind {
    /// Could not connect to the candidate
    Connect,
    /// No response within the timeout
    Timeout,
    /// Response arrived with a status other than 200
    Status(u16),
    /// Anything else: bad proxy URL, broken HTTP, TLS failure
    Protocol,
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeErrorKind::Connect => write!(f, "connection failed"),
            ProbeErrorKind::Timeout => write!(f, "timed out"),
            ProbeErrorKind::Status(code) => write!(f, "HTTP status {}", code),
            ProbeErrorKind::Protocol => write!(f, "protocol error"),
        }
    }
}

impl ProbeErrorKind {
    /// Classify a reqwest failure
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeErrorKind::Timeout
        } else if err.is_connect() {
            ProbeErrorKind::Connect
        } else if let Some(status) = err.status() {
            ProbeErrorKind::Status(status.as_u16())
        } else {
            ProbeErrorKind::Protocol
        }
    }
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("source {source_url} unreachable: {reason}")]
    SourceUnreachable { source_url: String, reason: String },

    #[error("malformed address {candidate}: {reason}")]
    MalformedAddress { candidate: String, reason: String },

    #[error("probe through {proxy} failed: {kind}")]
    ProbeFailure { proxy: String, kind: ProbeErrorKind },

    #[error("publish failed: {reason}")]
    PublishFailure { reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HarvestError {
    pub fn malformed(candidate: impl Into<String>, reason: impl Into<String>) -> Self {
        HarvestError::MalformedAddress {
            candidate: candidate.into(),
            reason: reason.into(),
        }
    }

    pub fn publish(reason: impl fmt::Display) -> Self {
        HarvestError::PublishFailure {
            reason: reason.to_string(),
        }
    }

    pub fn is_publish_failure(&self) -> bool {
        matches!(self, HarvestError::PublishFailure { .. })
    }
}
