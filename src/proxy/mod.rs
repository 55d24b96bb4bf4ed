//! Proxy collection and validation
//!
//! This module provides functionality for:
//! - Extracting `host:port` candidates from arbitrary text
//! - Fetching proxy lists from remote sources with isolated failures
//! - Aggregating candidates into a deduplicated pool
//! - Probing candidates concurrently through IP-echo endpoints

pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod pool;
pub mod probe;
pub mod validator;

pub use extractor::AddressExtractor;
pub use fetcher::{FetcherConfig, SourceFetcher, SourceReport};
pub use models::{ProbeResult, ProxyAddress, ProxyScheme, ValidationSummary};
pub use pool::CandidatePool;
pub use probe::{ProbeConfig, ProxyProbe};
pub use validator::{ValidationOrchestrator, ValidationRun, ValidatorConfig};
