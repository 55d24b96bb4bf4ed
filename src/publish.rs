//! Publishing: result artifact on disk plus an optional webhook report

use crate::error::HarvestError;
use crate::proxy::models::ValidationSummary;
use crate::{Config, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Where the verified set goes once a validation pass is over
#[async_trait]
pub trait ResultPublisher: Send + Sync {
    /// `Err` means nothing durable was produced. A report that could not be
    /// delivered after the artifact was written comes back as
    /// `ReportStatus::Failed` inside `Ok`.
    async fn publish(&self, summary: &ValidationSummary) -> Result<PublishOutcome>;
}

#[derive(Debug)]
pub enum ReportStatus {
    Delivered,
    /// No webhook configured
    Skipped,
    Failed(HarvestError),
}

#[derive(Debug)]
pub struct PublishOutcome {
    pub artifact: PathBuf,
    pub report: ReportStatus,
}

/// `valid_proxies_2025-01-01T00-00-00.000Z.txt`
pub fn artifact_file_name(timestamp: &DateTime<Utc>) -> String {
    let stamp = timestamp
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    format!("valid_proxies_{}.txt", stamp)
}

/// One `host:port` per line
pub fn artifact_contents(summary: &ValidationSummary) -> String {
    summary
        .sorted_valid()
        .iter()
        .map(|address| address.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Posts the artifact and summary counts to a Discord-style webhook
#[derive(Debug, Clone)]
pub struct WebhookReporter {
    client: Client,
    url: String,
}

impl WebhookReporter {
    pub fn new(url: String, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, url })
    }

    pub async fn deliver(&self, artifact: &Path, summary: &ValidationSummary) -> Result<()> {
        let bytes = tokio::fs::read(artifact)
            .await
            .map_err(|e| HarvestError::publish(format!("cannot read artifact: {}", e)))?;
        let file_name = artifact
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| artifact_file_name(&summary.timestamp));

        let file = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/plain")
            .map_err(HarvestError::publish)?;
        let form = Form::new()
            .part("file", file)
            .text("payload_json", report_payload(summary).to_string());

        self.client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(HarvestError::publish)?;

        Ok(())
    }
}

fn report_payload(summary: &ValidationSummary) -> serde_json::Value {
    json!({
        "content": "",
        "embeds": [{
            "color": 0,
            "title": "Proxy Validation Report",
            "description": "Summary of proxy collection and validation.",
            "fields": [
                {
                    "name": "Total Proxies Collected",
                    "value": format!("```{}```", summary.total_collected),
                    "inline": true
                },
                {
                    "name": "Proxies Tested",
                    "value": format!("```{}```", summary.total_validated),
                    "inline": true
                },
                {
                    "name": "Valid Proxies",
                    "value": format!("```{}```", summary.valid_count()),
                    "inline": true
                },
                {
                    "name": "Validation Date",
                    "value": format!("```{}```", summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC")),
                    "inline": false
                }
            ],
            "timestamp": summary.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        }]
    })
}

/// Writes the artifact under `results_dir`, then reports it if a webhook is set
#[derive(Debug, Clone)]
pub struct ArtifactPublisher {
    results_dir: PathBuf,
    reporter: Option<WebhookReporter>,
}

impl ArtifactPublisher {
    pub fn new<P: Into<PathBuf>>(results_dir: P) -> Self {
        Self {
            results_dir: results_dir.into(),
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: WebhookReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let publisher = Self::new(config.results_dir.clone());
        match &config.webhook_url {
            Some(url) => Ok(publisher.with_reporter(WebhookReporter::new(
                url.clone(),
                config.timeout,
                &config.user_agent,
            )?)),
            None => Ok(publisher),
        }
    }

    pub async fn write_artifact(&self, summary: &ValidationSummary) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.results_dir)
            .await
            .map_err(|e| {
                HarvestError::publish(format!(
                    "cannot create {}: {}",
                    self.results_dir.display(),
                    e
                ))
            })?;

        let path = self
            .results_dir
            .join(artifact_file_name(&summary.timestamp));
        tokio::fs::write(&path, artifact_contents(summary))
            .await
            .map_err(|e| HarvestError::publish(format!("cannot write {}: {}", path.display(), e)))?;

        info!(path = %path.display(), valid = summary.valid_count(), "proxies saved");
        Ok(path)
    }
}

#[async_trait]
impl ResultPublisher for ArtifactPublisher {
    async fn publish(&self, summary: &ValidationSummary) -> Result<PublishOutcome> {
        let artifact = self.write_artifact(summary).await?;

        let report = match &self.reporter {
            None => {
                info!("no webhook configured, skipping report");
                ReportStatus::Skipped
            }
            Some(reporter) => match reporter.deliver(&artifact, summary).await {
                Ok(()) => {
                    info!("report sent to webhook");
                    ReportStatus::Delivered
                }
                Err(e) => {
                    warn!(error = %e, "error sending report");
                    ReportStatus::Failed(e)
                }
            },
        };

        Ok(PublishOutcome { artifact, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProxyAddress;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn summary_with(valid: &[&str]) -> ValidationSummary {
        let valid: HashSet<ProxyAddress> = valid.iter().map(|s| s.parse().unwrap()).collect();
        ValidationSummary::new(10, 5, valid)
    }

    #[test]
    fn test_artifact_file_name() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            artifact_file_name(&ts),
            "valid_proxies_2025-01-01T00-00-00.000Z.txt"
        );
    }

    #[test]
    fn test_artifact_contents() {
        let summary = summary_with(&["5.6.7.8:3128", "1.2.3.4:8080"]);
        assert_eq!(artifact_contents(&summary), "1.2.3.4:8080\n5.6.7.8:3128");
        assert_eq!(artifact_contents(&summary_with(&[])), "");
    }

    #[test]
    fn test_report_payload_counts() {
        let payload = report_payload(&summary_with(&["1.2.3.4:8080"]));
        let fields = &payload["embeds"][0]["fields"];
        assert_eq!(fields[0]["value"], "```10```");
        assert_eq!(fields[1]["value"], "```5```");
        assert_eq!(fields[2]["value"], "```1```");
    }

    #[tokio::test]
    async fn test_publish_without_webhook_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path().join("nested").join("proxies"));
        let summary = summary_with(&["1.2.3.4:8080"]);

        let outcome = publisher.publish(&summary).await.unwrap();
        assert!(matches!(outcome.report, ReportStatus::Skipped));
        assert_eq!(
            std::fs::read_to_string(&outcome.artifact).unwrap(),
            "1.2.3.4:8080"
        );
    }

    #[tokio::test]
    async fn test_publish_fails_when_directory_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let publisher = ArtifactPublisher::new(blocker.join("proxies"));
        let err = publisher.publish(&summary_with(&[])).await.unwrap_err();
        assert!(err.is_publish_failure());
    }
}
