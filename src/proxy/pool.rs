//! Candidate pool: deduplicated union of every source's candidates

use crate::proxy::fetcher::{SourceFetcher, SourceReport};
use crate::proxy::models::ProxyAddress;
use futures::stream::{self, StreamExt};
use std::collections::hash_set;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePool {
    proxies: HashSet<ProxyAddress>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the address was already present
    pub fn insert(&mut self, address: ProxyAddress) -> bool {
        self.proxies.insert(address)
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn contains(&self, address: &ProxyAddress) -> bool {
        self.proxies.contains(address)
    }

    /// Candidates in canonical order
    pub fn to_sorted_vec(&self) -> Vec<ProxyAddress> {
        let mut proxies: Vec<_> = self.proxies.iter().cloned().collect();
        proxies.sort();
        proxies
    }

    /// Fetch every source concurrently and union the results
    ///
    /// Completes once every fetch has settled. Failed sources contribute
    /// nothing; at most `concurrency` fetches are in flight at a time.
    pub async fn aggregate(
        fetcher: &SourceFetcher,
        sources: &[String],
        concurrency: usize,
    ) -> CandidatePool {
        info!(sources = sources.len(), "starting to collect proxies from all sources");

        let reports: Vec<SourceReport> = stream::iter(sources)
            .map(|source| fetcher.fetch_report(source))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let failed = reports.iter().filter(|r| !r.is_success()).count();
        let pool: CandidatePool = reports.into_iter().flat_map(|r| r.proxies).collect();

        info!(
            collected = pool.len(),
            failed_sources = failed,
            "total proxies collected"
        );
        pool
    }
}

impl Extend<ProxyAddress> for CandidatePool {
    fn extend<T: IntoIterator<Item = ProxyAddress>>(&mut self, iter: T) {
        self.proxies.extend(iter);
    }
}

impl FromIterator<ProxyAddress> for CandidatePool {
    fn from_iter<T: IntoIterator<Item = ProxyAddress>>(iter: T) -> Self {
        Self {
            proxies: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CandidatePool {
    type Item = ProxyAddress;
    type IntoIter = hash_set::IntoIter<ProxyAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.proxies.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandidatePool {
    type Item = &'a ProxyAddress;
    type IntoIter = hash_set::Iter<'a, ProxyAddress>;

    fn into_iter(self) -> Self::IntoIter {
        self.proxies.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> ProxyAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_pool_deduplicates() {
        let mut pool = CandidatePool::new();
        assert!(pool.insert(addr("1.2.3.4:80")));
        assert!(!pool.insert(addr("1.2.3.4:80")));
        pool.extend([addr("1.2.3.4:80"), addr("5.6.7.8:80")]);
        assert_eq!(pool.len(), 2);
        assert!(pool.contains(&addr("5.6.7.8:80")));
    }

    #[test]
    fn test_pool_sorted_vec() {
        let pool: CandidatePool = [addr("9.9.9.9:80"), addr("1.1.1.1:80")].into_iter().collect();
        assert_eq!(
            pool.to_sorted_vec(),
            vec![addr("1.1.1.1:80"), addr("9.9.9.9:80")]
        );
    }

    #[tokio::test]
    async fn test_aggregate_with_no_sources() {
        let fetcher = SourceFetcher::new().unwrap();
        let pool = CandidatePool::aggregate(&fetcher, &[], 4).await;
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_all_sources_failing() {
        let fetcher = SourceFetcher::new().unwrap();
        let sources = vec!["not a url".to_string(), "also://bogus".to_string()];
        let pool = CandidatePool::aggregate(&fetcher, &sources, 4).await;
        assert!(pool.is_empty());
    }
}
