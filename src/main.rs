use anyhow::{Context, Result};
use clap::Parser;
use proxy_harvest::{
    load_source_file, Config, PipelineDriver, ProxyScheme, DEFAULT_CONCURRENCY, DEFAULT_RESULTS_DIR,
    DEFAULT_SAMPLE_SIZE, DEFAULT_TIMEOUT_SECS,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Collect public proxies, validate a sample of them and publish the working ones
#[derive(Parser)]
#[command(name = "proxy-harvest")]
#[command(about = "Collect public proxies, validate a sample of them and publish the working ones")]
struct Cli {
    /// Source URLs to collect from (can specify multiple, replaces the built-in list)
    #[arg(short = 'u', long = "source")]
    sources: Vec<String>,
    /// File containing source URLs (one URL per line)
    #[arg(short = 'f', long)]
    source_file: Option<PathBuf>,
    /// Collect from the backup source list instead of the primary one
    #[arg(long)]
    use_backup: bool,
    /// Maximum number of proxies to validate
    #[arg(short = 's', long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,
    /// Maximum number of simultaneous requests
    #[arg(short = 'n', long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
    /// Timeout in seconds for every request
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
    /// Check endpoints to route probes to (can specify multiple)
    #[arg(long = "check-url")]
    check_urls: Vec<String>,
    /// Directory for result files
    #[arg(short = 'o', long, default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,
    /// Webhook to report to (falls back to DISCORD_WEBHOOK)
    #[arg(long)]
    webhook: Option<String>,
    /// Seed for the sampler
    #[arg(long)]
    seed: Option<u64>,
    /// Reject addresses with octets above 255
    #[arg(long)]
    strict_octets: bool,
    /// How to talk to candidates (http, socks5)
    #[arg(long, default_value = "http")]
    proxy_scheme: String,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let scheme: ProxyScheme = self.proxy_scheme.parse()?;
        let webhook = self
            .webhook
            .or_else(|| std::env::var("DISCORD_WEBHOOK").ok());

        let mut sources = self.sources;
        if let Some(path) = &self.source_file {
            let from_file = load_source_file(path)
                .with_context(|| format!("loading sources from {:?}", path))?;
            tracing::info!(count = from_file.len(), "loaded sources from file");
            sources.extend(from_file);
        }

        let mut config = Config::new()
            .with_use_backup(self.use_backup)
            .with_sample_size(self.sample_size)
            .with_concurrency(self.concurrency)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_results_dir(self.results_dir)
            .with_webhook_url(webhook)
            .with_strict_octets(self.strict_octets)
            .with_proxy_scheme(scheme);
        if !sources.is_empty() {
            config = config.with_sources(sources);
        }
        if !self.check_urls.is_empty() {
            config = config.with_check_urls(self.check_urls);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,proxy_harvest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().into_config()?;
    if config.webhook_url.is_none() {
        tracing::warn!("no webhook configured, results will only be written to disk");
    }

    let mut driver = PipelineDriver::new(config).context("building pipeline")?;
    let report = driver.run().await;

    if let Some(summary) = &report.summary {
        tracing::info!(
            collected = summary.total_collected,
            validated = summary.total_validated,
            valid = summary.valid_count(),
            "summary"
        );
    }
    if let Some(err) = &report.failure {
        tracing::error!(state = ?report.state, error = %err, "run failed");
    }

    Ok(report.exit_code())
}
