//! Source fetcher: pulls one remote list and extracts candidates
//!
//! A failing source never propagates an error. It is logged and reported as
//! an empty set so collection from the other sources carries on.

use crate::error::HarvestError;
use crate::proxy::extractor::AddressExtractor;
use crate::proxy::models::ProxyAddress;
use crate::{Config, Result, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// Result of fetching a single source
#[derive(Debug, Clone)]
pub struct SourceReport {
    /// The source that was fetched
    pub source: String,
    /// Candidates extracted from the source
    pub proxies: HashSet<ProxyAddress>,
    /// Error message if fetching failed
    pub error: Option<String>,
}

impl SourceReport {
    /// Create a successful fetch report
    pub fn success(source: String, proxies: HashSet<ProxyAddress>) -> Self {
        Self {
            source,
            proxies,
            error: None,
        }
    }

    /// Create a failed fetch report
    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            proxies: HashSet::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Configuration for the source fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Timeout for each HTTP request
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Octet rule handed to the extractor
    pub strict_octets: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            strict_octets: false,
        }
    }
}

impl FetcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_strict_octets(mut self, strict: bool) -> Self {
        self.strict_octets = strict;
        self
    }
}

impl From<&Config> for FetcherConfig {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.timeout,
            user_agent: config.user_agent.clone(),
            strict_octets: config.strict_octets,
        }
    }
}

/// Fetches proxy lists over HTTP
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: Client,
    extractor: AddressExtractor,
}

impl SourceFetcher {
    pub fn new() -> Result<Self> {
        Self::with_config(FetcherConfig::default())
    }

    pub fn with_config(config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            extractor: AddressExtractor::new().with_strict_octets(config.strict_octets),
        })
    }

    /// Candidates from one source; empty on any failure
    pub async fn fetch(&self, url: &str) -> HashSet<ProxyAddress> {
        self.fetch_report(url).await.proxies
    }

    /// Fetch one source and report what happened
    pub async fn fetch_report(&self, url: &str) -> SourceReport {
        match self.try_fetch(url).await {
            Ok(proxies) => {
                info!(source = url, collected = proxies.len(), "collected proxies");
                SourceReport::success(url.to_string(), proxies)
            }
            Err(e) => {
                warn!(source = url, error = %e, "error collecting from source");
                SourceReport::failure(url.to_string(), e.to_string())
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<HashSet<ProxyAddress>> {
        let unreachable = |e: reqwest::Error| HarvestError::SourceUnreachable {
            source_url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(unreachable)?;
        let content = response.text().await.map_err(unreachable)?;

        Ok(self.extractor.extract_unique(&content))
    }
}
