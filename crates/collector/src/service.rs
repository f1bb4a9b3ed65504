use std::sync::Arc;

use analysis::MetricsReport;
use common::DateRange;
use serde::Serialize;
use tracing::{info, instrument};

use crate::cache::FetchCache;
use crate::client::{RecordSource, RepoRef};
use crate::credential::Credential;
use crate::fetcher::{FetchError, RecordBatch, RecordFetcher, RepoStats};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositoryReport {
    pub repository: String,
    pub date_range: Option<DateRange>,
    pub stats: RepoStats,
    #[serde(flatten)]
    pub metrics: MetricsReport,
}

/// Entry point for consumers. Metrics are recomputed on every call; only
/// the remote fetch is memoized.
pub struct MetricsService {
    fetcher: RecordFetcher,
}

impl MetricsService {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self::with_cache(source, FetchCache::new())
    }

    pub fn with_cache(source: Arc<dyn RecordSource>, cache: FetchCache) -> Self {
        Self {
            fetcher: RecordFetcher::new(source, cache),
        }
    }

    pub fn cache(&self) -> &FetchCache {
        self.fetcher.cache()
    }

    /// Normalized records behind a report. Served from the cache after a
    /// `compute_metrics` call with the same arguments.
    pub async fn fetch_records(
        &self,
        repo: &RepoRef,
        credential: &Credential,
        range: Option<DateRange>,
    ) -> Result<Arc<RecordBatch>, FetchError> {
        self.fetcher.fetch(repo, credential, range).await
    }

    #[instrument(skip(self, credential), fields(repo = %repo))]
    pub async fn compute_metrics(
        &self,
        repo: &RepoRef,
        credential: &Credential,
        range: Option<DateRange>,
    ) -> Result<RepositoryReport, FetchError> {
        let batch = self.fetcher.fetch(repo, credential, range).await?;
        let metrics = MetricsReport::build(&batch.pull_requests, &batch.issues, batch.skipped());
        info!(
            merged = metrics.pull_requests.resolved,
            closed_issues = metrics.issues.resolved,
            skipped = metrics.skipped_records,
            warnings = ?metrics.warnings,
            "computed repository metrics"
        );
        Ok(RepositoryReport {
            repository: repo.to_string(),
            date_range: range,
            stats: batch.stats.clone(),
            metrics,
        })
    }
}
