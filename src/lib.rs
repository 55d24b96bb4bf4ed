//! Proxy Harvest - Proxy Collector and Validator
//!
//! Collects `host:port` candidates from public proxy lists, live-validates a
//! random sample of them through a set of IP-echo services and publishes the
//! working subset. One pass per run.

pub mod error;
pub mod pipeline;
pub mod proxy;
pub mod publish;

pub use error::{HarvestError, ProbeErrorKind};
pub use pipeline::{PipelineDriver, PipelineState, RunReport, Stage};
pub use proxy::*;
pub use publish::{ArtifactPublisher, PublishOutcome, ReportStatus, ResultPublisher};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application result type
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Default timeout for source fetches and probes in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of candidates probed per run
pub const DEFAULT_SAMPLE_SIZE: usize = 5000;

/// Default ceiling on simultaneous network calls
pub const DEFAULT_CONCURRENCY: usize = 256;

/// Default user agent for every outbound request
pub const DEFAULT_USER_AGENT: &str = "ProxyValidator/1.0";

/// Default directory for result artifacts
pub const DEFAULT_RESULTS_DIR: &str = "proxies";

/// Primary proxy sources (plain text lists, APIs or raw GitHub files)
pub const PROXY_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt",
    "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/http.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/http.txt",
    "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http&timeout=10000&country=all",
];

/// Backup sources, only used when explicitly selected
pub const BACKUP_PROXY_SOURCES: &[&str] = &[
    "https://www.proxyscan.io/download?type=http",
    "https://www.proxyscan.io/download?type=https",
    "https://www.proxyscan.io/download?type=socks4",
    "https://www.proxyscan.io/download?type=socks5",
    "https://raw.githubusercontent.com/hendrikbgr/Free-Proxy-List/master/free-proxy-list.txt",
    "https://raw.githubusercontent.com/opsxcq/proxy-list/master/list.txt",
];

/// IP-echo services used as connectivity oracles
pub const CHECK_URLS: &[&str] = &[
    "http://httpbin.org/ip",
    "https://api.ipify.org?format=json",
    "http://ip-api.com/json/",
];

/// Application configuration, built once and handed to the pipeline driver
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary source URLs
    pub sources: Vec<String>,
    /// Backup source URLs
    pub backup_sources: Vec<String>,
    /// Collect from the backup list instead of the primary one
    pub use_backup: bool,
    /// Endpoints probes are routed to
    pub check_urls: Vec<String>,
    /// Per-request timeout for fetches and probes
    pub timeout: Duration,
    /// User agent for every outbound request
    pub user_agent: String,
    /// Maximum number of candidates probed
    pub sample_size: usize,
    /// Maximum number of simultaneous network calls
    pub concurrency: usize,
    /// Seed for the sampler; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Reject hosts with octets above 255
    pub strict_octets: bool,
    /// How probes talk to a candidate
    pub proxy_scheme: ProxyScheme,
    /// Directory result artifacts are written to
    pub results_dir: PathBuf,
    /// Report destination
    pub webhook_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: PROXY_SOURCES.iter().map(|s| s.to_string()).collect(),
            backup_sources: BACKUP_PROXY_SOURCES.iter().map(|s| s.to_string()).collect(),
            use_backup: false,
            check_urls: CHECK_URLS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            seed: None,
            strict_octets: false,
            proxy_scheme: ProxyScheme::Http,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            webhook_url: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_backup_sources(mut self, sources: Vec<String>) -> Self {
        self.backup_sources = sources;
        self
    }

    pub fn with_use_backup(mut self, use_backup: bool) -> Self {
        self.use_backup = use_backup;
        self
    }

    pub fn with_check_urls(mut self, urls: Vec<String>) -> Self {
        self.check_urls = urls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_strict_octets(mut self, strict: bool) -> Self {
        self.strict_octets = strict;
        self
    }

    pub fn with_proxy_scheme(mut self, scheme: ProxyScheme) -> Self {
        self.proxy_scheme = scheme;
        self
    }

    pub fn with_results_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Set the webhook; blank values and the stock placeholder mean "none"
    pub fn with_webhook_url(mut self, url: Option<String>) -> Self {
        self.webhook_url = url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty() && u != "YOUR_WEBHOOK_HERE");
        self
    }

    /// Source list the collecting stage should use
    pub fn active_sources(&self) -> &[String] {
        if self.use_backup {
            &self.backup_sources
        } else {
            &self.sources
        }
    }
}

/// Read source URLs from a file, one per line
///
/// Blank lines and lines starting with `#` are skipped.
pub fn load_source_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        HarvestError::Config(format!("cannot read source file {}: {}", path.display(), e))
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
