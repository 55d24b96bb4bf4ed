//! Proxy data models

use crate::error::{HarvestError, ProbeErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How a probe talks to the candidate it is routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProxyScheme {
    #[default]
    Http,
    Socks5,
}

impl fmt::Display for ProxyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyScheme::Http => write!(f, "http"),
            ProxyScheme::Socks5 => write!(f, "socks5"),
        }
    }
}

impl FromStr for ProxyScheme {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(ProxyScheme::Http),
            "socks5" => Ok(ProxyScheme::Socks5),
            _ => Err(HarvestError::Config(format!(
                "invalid proxy scheme: {}. Use: http, socks5",
                s
            ))),
        }
    }
}

/// A `host:port` candidate
///
/// Equality and hashing follow the canonical `host:port` string, which is
/// fully determined by the two fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ProxyAddress {
    host: String,
    port: u16,
}

impl ProxyAddress {
    /// Build an address, rejecting an empty host or port 0
    pub fn new(host: impl Into<String>, port: u16) -> crate::Result<Self> {
        let host = host.into();
        if host.is_empty() {
            return Err(HarvestError::malformed(format!(":{}", port), "empty host"));
        }
        if port == 0 {
            return Err(HarvestError::malformed(format!("{}:0", host), "port 0"));
        }
        Ok(Self { host, port })
    }

    /// Build an address from a host and a raw port string
    pub fn from_parts(host: &str, port: &str) -> crate::Result<Self> {
        let port: u16 = port
            .parse()
            .map_err(|_| HarvestError::malformed(format!("{}:{}", host, port), "port out of range"))?;
        Self::new(host, port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Proxy URL for routing requests through this address
    pub fn url(&self, scheme: ProxyScheme) -> String {
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyAddress {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| HarvestError::malformed(s, "missing port"))?;
        Self::from_parts(host, port)
    }
}

impl From<ProxyAddress> for String {
    fn from(address: ProxyAddress) -> Self {
        address.to_string()
    }
}

impl TryFrom<String> for ProxyAddress {
    type Error = HarvestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Outcome of one probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub address: ProxyAddress,
    pub reachable: bool,
    pub error: Option<ProbeErrorKind>,
    pub response_time_ms: Option<u64>,
}

impl ProbeResult {
    /// Create a result for a candidate that answered 200
    pub fn reachable(address: ProxyAddress, response_time_ms: u64) -> Self {
        Self {
            address,
            reachable: true,
            error: None,
            response_time_ms: Some(response_time_ms),
        }
    }

    /// Create a failed result
    pub fn unreachable(address: ProxyAddress, error: ProbeErrorKind) -> Self {
        Self {
            address,
            reachable: false,
            error: Some(error),
            response_time_ms: None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// The failure as a `ProbeFailure` error, if the probe failed
    pub fn failure(&self) -> Option<HarvestError> {
        self.error.map(|kind| HarvestError::ProbeFailure {
            proxy: self.address.to_string(),
            kind,
        })
    }
}

/// Terminal artifact of one validation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Size of the candidate pool
    pub total_collected: usize,
    /// Number of candidates actually probed
    pub total_validated: usize,
    pub valid_proxies: HashSet<ProxyAddress>,
    pub timestamp: DateTime<Utc>,
}

impl ValidationSummary {
    pub fn new(
        total_collected: usize,
        total_validated: usize,
        valid_proxies: HashSet<ProxyAddress>,
    ) -> Self {
        Self {
            total_collected,
            total_validated,
            valid_proxies,
            timestamp: Utc::now(),
        }
    }

    pub fn valid_count(&self) -> usize {
        self.valid_proxies.len()
    }

    /// Valid proxies in canonical order
    pub fn sorted_valid(&self) -> Vec<&ProxyAddress> {
        let mut valid: Vec<_> = self.valid_proxies.iter().collect();
        valid.sort();
        valid
    }
}
