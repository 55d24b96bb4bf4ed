//! Validation orchestrator: samples the pool and probes the sample concurrently

use crate::proxy::models::{ProbeResult, ProxyAddress, ValidationSummary};
use crate::proxy::pool::CandidatePool;
use crate::proxy::probe::{ProbeConfig, ProxyProbe};
use crate::{Config, Result, DEFAULT_CONCURRENCY, DEFAULT_SAMPLE_SIZE};
use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::info;

/// Configuration for the validation pass
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Maximum number of candidates probed
    pub sample_size: usize,
    /// Maximum number of probes in flight
    pub concurrency: usize,
    /// Sampler seed; `None` seeds from OS entropy
    pub seed: Option<u64>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            seed: None,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
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
}

impl From<&Config> for ValidatorConfig {
    fn from(config: &Config) -> Self {
        Self {
            sample_size: config.sample_size,
            concurrency: config.concurrency.max(1),
            seed: config.seed,
        }
    }
}

/// Everything one validation pass produced
#[derive(Debug, Clone)]
pub struct ValidationRun {
    /// Candidates drawn from the pool
    pub sampled: Vec<ProxyAddress>,
    /// One result per sampled candidate
    pub results: Vec<ProbeResult>,
    pub summary: ValidationSummary,
}

pub struct ValidationOrchestrator {
    config: ValidatorConfig,
    probe: ProxyProbe,
}

impl ValidationOrchestrator {
    pub fn new(config: ValidatorConfig, probe: ProxyProbe) -> Self {
        Self { config, probe }
    }

    /// Build from the application config
    pub fn from_config(config: &Config) -> Result<Self> {
        let probe = ProxyProbe::with_config(ProbeConfig::from(config))?;
        Ok(Self::new(ValidatorConfig::from(config), probe))
    }

    /// Uniform sample without replacement; the whole pool if it is small enough
    ///
    /// The pool is put in canonical order first so a seeded `rng` always draws
    /// the same sample.
    pub fn sample<R: Rng + ?Sized>(
        pool: &CandidatePool,
        sample_size: usize,
        rng: &mut R,
    ) -> Vec<ProxyAddress> {
        pool.to_sorted_vec()
            .choose_multiple(rng, sample_size)
            .cloned()
            .collect()
    }

    /// Sample the pool and probe every sampled candidate, using the
    /// configured sample size
    pub async fn validate(&self, pool: &CandidatePool) -> ValidationSummary {
        self.validate_sample(pool, self.config.sample_size).await
    }

    /// Like `validate`, with an explicit sample size
    pub async fn validate_sample(
        &self,
        pool: &CandidatePool,
        sample_size: usize,
    ) -> ValidationSummary {
        self.run_sample(pool, sample_size).await.summary
    }

    /// Like `validate`, keeping the sample and per-probe results
    pub async fn run(&self, pool: &CandidatePool) -> ValidationRun {
        self.run_sample(pool, self.config.sample_size).await
    }

    /// Like `run`, with an explicit sample size
    pub async fn run_sample(&self, pool: &CandidatePool, sample_size: usize) -> ValidationRun {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let sampled = Self::sample(pool, sample_size, &mut rng);
        info!(
            pool = pool.len(),
            sampled = sampled.len(),
            concurrency = self.config.concurrency,
            "starting proxy validation"
        );

        let assignments: Vec<(ProxyAddress, &str)> = sampled
            .iter()
            .map(|address| (address.clone(), self.probe.pick_endpoint(&mut rng)))
            .collect();
        let results = self.probe_all(assignments).await;

        let valid: HashSet<ProxyAddress> = results
            .iter()
            .filter(|r| r.is_reachable())
            .map(|r| r.address.clone())
            .collect();
        let summary = ValidationSummary::new(pool.len(), results.len(), valid);
        info!(
            validated = summary.total_validated,
            valid = summary.valid_count(),
            "validation finished"
        );

        ValidationRun {
            sampled,
            results,
            summary,
        }
    }

    /// Probe each candidate against its assigned endpoint, bounded by the
    /// configured concurrency
    async fn probe_all(&self, assignments: Vec<(ProxyAddress, &str)>) -> Vec<ProbeResult> {
        stream::iter(assignments)
            .map(|(address, endpoint)| async move {
                self.probe.probe_via(&address, endpoint).await
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await
    }
}
