//! Liveness probe for a single candidate

use crate::error::{HarvestError, ProbeErrorKind};
use crate::proxy::models::{ProbeResult, ProxyAddress, ProxyScheme};
use crate::{Config, Result, CHECK_URLS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use rand::Rng;
use reqwest::{Client, Proxy as ReqwestProxy, StatusCode};
use std::time::{Duration, Instant};
use tracing::debug;

/// Slack on top of the client timeout before the probe is abandoned
const PROBE_GRACE: Duration = Duration::from_millis(500);

/// Configuration for the proxy probe
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Timeout for each probe
    pub timeout: Duration,
    /// User agent sent to the check endpoint
    pub user_agent: String,
    /// Endpoints to route probes to, one picked per probe
    pub check_urls: Vec<String>,
    /// How to talk to the candidate
    pub scheme: ProxyScheme,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            check_urls: CHECK_URLS.iter().map(|s| s.to_string()).collect(),
            scheme: ProxyScheme::Http,
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_check_urls(mut self, urls: Vec<String>) -> Self {
        self.check_urls = urls;
        self
    }

    pub fn with_scheme(mut self, scheme: ProxyScheme) -> Self {
        self.scheme = scheme;
        self
    }
}

impl From<&Config> for ProbeConfig {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.timeout,
            user_agent: config.user_agent.clone(),
            check_urls: config.check_urls.clone(),
            scheme: config.proxy_scheme,
        }
    }
}

/// Routes a request through a candidate and reports whether it came back 200
#[derive(Debug, Clone)]
pub struct ProxyProbe {
    config: ProbeConfig,
}

impl ProxyProbe {
    pub fn new() -> Self {
        Self {
            config: ProbeConfig::default(),
        }
    }

    /// Fails when no check endpoint is configured
    pub fn with_config(config: ProbeConfig) -> Result<Self> {
        if config.check_urls.is_empty() {
            return Err(HarvestError::Config(
                "at least one check URL is required".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Pick a check endpoint
    pub fn pick_endpoint<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let index = rng.gen_range(0..self.config.check_urls.len());
        &self.config.check_urls[index]
    }

    /// Probe through `address` against a randomly chosen endpoint
    pub async fn probe(&self, address: &ProxyAddress) -> ProbeResult {
        let endpoint = self.pick_endpoint(&mut rand::thread_rng());
        self.probe_via(address, endpoint).await
    }

    /// Probe through `address` against `endpoint`
    ///
    /// Never fails: every outcome becomes a `ProbeResult`, and the call is
    /// abandoned shortly after the configured timeout.
    pub async fn probe_via(&self, address: &ProxyAddress, endpoint: &str) -> ProbeResult {
        let start = Instant::now();

        let client = match self.create_client(address) {
            Ok(client) => client,
            Err(e) => {
                debug!(proxy = %address, error = %e, "cannot build probe client");
                return ProbeResult::unreachable(address.clone(), ProbeErrorKind::Protocol);
            }
        };

        let result = match tokio::time::timeout(
            self.config.timeout + PROBE_GRACE,
            client.get(endpoint).send(),
        )
        .await
        {
            Ok(Ok(response)) if response.status() == StatusCode::OK => {
                let elapsed = start.elapsed().as_millis() as u64;
                ProbeResult::reachable(address.clone(), elapsed)
            }
            Ok(Ok(response)) => ProbeResult::unreachable(
                address.clone(),
                ProbeErrorKind::Status(response.status().as_u16()),
            ),
            Ok(Err(e)) => {
                ProbeResult::unreachable(address.clone(), ProbeErrorKind::from_reqwest(&e))
            }
            Err(_) => ProbeResult::unreachable(address.clone(), ProbeErrorKind::Timeout),
        };

        match result.failure() {
            Some(e) => debug!(endpoint, error = %e, "probe failed"),
            None => debug!(proxy = %address, endpoint, "probe succeeded"),
        }
        result
    }

    /// Create a reqwest client routed through the candidate
    fn create_client(&self, address: &ProxyAddress) -> Result<Client> {
        let proxy = ReqwestProxy::all(address.url(self.config.scheme))?;

        let client = Client::builder()
            .proxy(proxy)
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()?;

        Ok(client)
    }
}

impl Default for ProxyProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_probe_config_default() {
        let config = ProbeConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.check_urls.len(), 3);
        assert_eq!(config.scheme, ProxyScheme::Http);
    }

    #[test]
    fn test_probe_config_builder() {
        let config = ProbeConfig::new()
            .with_timeout(Duration::from_secs(30))
            .with_check_urls(vec!["http://example.com".to_string()])
            .with_scheme(ProxyScheme::Socks5);

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.check_urls, vec!["http://example.com"]);
        assert_eq!(config.scheme, ProxyScheme::Socks5);
    }

    #[test]
    fn test_probe_requires_check_urls() {
        let err = ProxyProbe::with_config(ProbeConfig::new().with_check_urls(vec![])).unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));
    }

    #[test]
    fn test_pick_endpoint_spreads_over_all_urls() {
        let probe = ProxyProbe::new();
        let mut rng = StdRng::seed_from_u64(7);
        let picked: HashSet<_> = (0..200).map(|_| probe.pick_endpoint(&mut rng)).collect();
        assert_eq!(picked.len(), CHECK_URLS.len());
    }

    #[tokio::test]
    async fn test_probe_dead_candidate_is_unreachable() {
        // Reserve a port, then free it so nothing is listening there.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let address = ProxyAddress::new("127.0.0.1", port).unwrap();
        let probe = ProxyProbe::with_config(
            ProbeConfig::new()
                .with_timeout(Duration::from_secs(2))
                .with_check_urls(vec!["http://check.invalid/ip".to_string()]),
        )
        .unwrap();

        let result = probe.probe(&address).await;
        assert!(!result.is_reachable());
        assert!(result.error.is_some());
        assert_eq!(result.address, address);
    }
}
