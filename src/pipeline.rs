//! Pipeline driver: collect, validate, publish

use crate::error::HarvestError;
use crate::proxy::fetcher::{FetcherConfig, SourceFetcher};
use crate::proxy::models::ValidationSummary;
use crate::proxy::pool::CandidatePool;
use crate::proxy::validator::ValidationOrchestrator;
use crate::publish::{ArtifactPublisher, ReportStatus, ResultPublisher};
use crate::{Config, Result};
use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collecting,
    Validating,
    Publishing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Collecting => write!(f, "collecting"),
            Stage::Validating => write!(f, "validating"),
            Stage::Publishing => write!(f, "publishing"),
        }
    }
}

/// `Idle -> Collecting -> Validating -> Publishing -> Done`, any working
/// stage may end in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Collecting,
    Validating,
    Publishing,
    Done,
    Failed(Stage),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }
}

/// What a run produced
#[derive(Debug)]
pub struct RunReport {
    pub state: PipelineState,
    pub summary: Option<ValidationSummary>,
    pub artifact: Option<PathBuf>,
    pub failure: Option<HarvestError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Done && self.failure.is_none()
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

pub struct PipelineDriver<P = ArtifactPublisher> {
    config: Config,
    fetcher: SourceFetcher,
    orchestrator: ValidationOrchestrator,
    publisher: P,
    state: PipelineState,
}

impl PipelineDriver<ArtifactPublisher> {
    /// Driver publishing through the artifact writer described by `config`
    pub fn new(config: Config) -> Result<Self> {
        let publisher = ArtifactPublisher::from_config(&config)?;
        Self::with_publisher(config, publisher)
    }
}

impl<P: ResultPublisher> PipelineDriver<P> {
    /// Builds every stage up front, so a bad config fails here before any I/O
    pub fn with_publisher(config: Config, publisher: P) -> Result<Self> {
        let fetcher = SourceFetcher::with_config(FetcherConfig::from(&config))?;
        let orchestrator = ValidationOrchestrator::from_config(&config)?;
        Ok(Self {
            config,
            fetcher,
            orchestrator,
            publisher,
            state: PipelineState::Idle,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }

    fn fail(
        &mut self,
        stage: Stage,
        err: HarvestError,
        summary: Option<ValidationSummary>,
        artifact: Option<PathBuf>,
    ) -> RunReport {
        error!(stage = %stage, error = %err, "pipeline stage failed");
        self.transition(PipelineState::Failed(stage));
        RunReport {
            state: self.state,
            summary,
            artifact,
            failure: Some(err),
        }
    }

    /// Run one pass. Stages are not retried, and a driver that already
    /// reached `Done` or `Failed` does no further work.
    pub async fn run(&mut self) -> RunReport {
        if self.state.is_terminal() {
            warn!(state = ?self.state, "pipeline already finished, not running again");
            return RunReport {
                state: self.state,
                summary: None,
                artifact: None,
                failure: Some(HarvestError::Config("driver already ran".to_string())),
            };
        }

        self.transition(PipelineState::Collecting);
        if self.config.use_backup {
            info!("collecting from backup sources");
        }
        let pool = CandidatePool::aggregate(
            &self.fetcher,
            self.config.active_sources(),
            self.config.concurrency,
        )
        .await;

        self.transition(PipelineState::Validating);
        let summary = self.orchestrator.validate(&pool).await;

        self.transition(PipelineState::Publishing);
        let outcome = match self.publisher.publish(&summary).await {
            Ok(outcome) => outcome,
            Err(e) => return self.fail(Stage::Publishing, e, Some(summary), None),
        };

        if let ReportStatus::Failed(e) = outcome.report {
            return self.fail(Stage::Publishing, e, Some(summary), Some(outcome.artifact));
        }

        self.transition(PipelineState::Done);
        info!(
            collected = summary.total_collected,
            validated = summary.total_validated,
            valid = summary.valid_count(),
            artifact = %outcome.artifact.display(),
            "run complete"
        );
        RunReport {
            state: self.state,
            summary: Some(summary),
            artifact: Some(outcome.artifact),
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::PublishOutcome;
    use async_trait::async_trait;

    struct RejectingPublisher;

    #[async_trait]
    impl ResultPublisher for RejectingPublisher {
        async fn publish(&self, _summary: &ValidationSummary) -> Result<PublishOutcome> {
            Err(HarvestError::publish("storage offline"))
        }
    }

    fn offline_config() -> Config {
        Config::new().with_sources(vec![]).with_sample_size(10)
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed(Stage::Collecting).is_terminal());
        assert!(!PipelineState::Idle.is_terminal());
        assert!(!PipelineState::Validating.is_terminal());
    }

    #[tokio::test]
    async fn test_run_with_no_sources_completes() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config().with_results_dir(dir.path());
        let mut driver = PipelineDriver::new(config).unwrap();
        assert_eq!(driver.state(), PipelineState::Idle);

        let report = driver.run().await;
        assert!(report.is_success());
        assert_eq!(driver.state(), PipelineState::Done);
        let summary = report.summary.unwrap();
        assert_eq!(summary.total_collected, 0);
        assert!(report.artifact.unwrap().exists());
    }

    #[tokio::test]
    async fn test_finished_driver_does_not_run_again() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config().with_results_dir(dir.path());
        let mut driver = PipelineDriver::new(config).unwrap();

        assert!(driver.run().await.is_success());
        let second = driver.run().await;

        assert_eq!(second.state, PipelineState::Done);
        assert!(!second.is_success());
        assert!(second.summary.is_none());
        assert!(second.artifact.is_none());
        assert!(matches!(second.failure, Some(HarvestError::Config(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_driver_stays_failed() {
        let mut driver =
            PipelineDriver::with_publisher(offline_config(), RejectingPublisher).unwrap();

        driver.run().await;
        let second = driver.run().await;
        assert_eq!(second.state, PipelineState::Failed(Stage::Publishing));
        assert!(matches!(second.failure, Some(HarvestError::Config(_))));
    }

    #[tokio::test]
    async fn test_publish_error_keeps_summary() {
        let mut driver =
            PipelineDriver::with_publisher(offline_config(), RejectingPublisher).unwrap();

        let report = driver.run().await;
        assert_eq!(report.state, PipelineState::Failed(Stage::Publishing));
        assert!(report.summary.is_some());
        assert!(report.artifact.is_none());
        assert!(report.failure.unwrap().is_publish_failure());
    }

    #[test]
    fn test_missing_check_urls_rejected_at_construction() {
        let config = offline_config().with_check_urls(vec![]);
        let err = PipelineDriver::with_publisher(config, RejectingPublisher)
            .err()
            .unwrap();
        assert!(matches!(err, HarvestError::Config(_)));
    }
}
