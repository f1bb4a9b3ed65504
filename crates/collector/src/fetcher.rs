use std::sync::Arc;

use common::DateRange;
use normalizer::{
    normalize_batch, ActivityRecord, MalformedRecordError, NormalizedBatch, RawRecord, RecordKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::cache::{FetchCache, FetchKey};
use crate::client::{RecordSource, RepoRef, SourceError};
use crate::credential::Credential;
use crate::metrics;

/// Fetch-level failures. Any of these aborts the whole request; nothing
/// partial is returned.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("repository {0} not found")]
    RepositoryNotFound(String),
    #[error(transparent)]
    Source(SourceError),
}

impl From<SourceError> for FetchError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Authentication { endpoint } => {
                Self::Authentication(format!("credential rejected for {endpoint}"))
            }
            SourceError::RepositoryNotFound(repo) => Self::RepositoryNotFound(repo),
            other => Self::Source(other),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoStats {
    pub full_name: String,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub open_issues_count: i64,
}

impl RepoStats {
    fn from_value(value: Value) -> Result<Self, SourceError> {
        serde_json::from_value(value).map_err(|err| SourceError::Decode {
            endpoint: "repo".to_string(),
            message: err.to_string(),
        })
    }
}

/// Normalized result of one fetch, shared read-only between cache hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub stats: RepoStats,
    pub pull_requests: Vec<ActivityRecord>,
    pub issues: Vec<ActivityRecord>,
    pub rejected: Vec<MalformedRecordError>,
}

impl RecordBatch {
    pub fn skipped(&self) -> usize {
        self.rejected.len()
    }
}

pub struct RecordFetcher {
    source: Arc<dyn RecordSource>,
    cache: FetchCache,
}

impl RecordFetcher {
    pub fn new(source: Arc<dyn RecordSource>, cache: FetchCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    #[instrument(skip(self, credential), fields(repo = %repo))]
    pub async fn fetch(
        &self,
        repo: &RepoRef,
        credential: &Credential,
        range: Option<DateRange>,
    ) -> Result<Arc<RecordBatch>, FetchError> {
        if credential.is_blank() {
            return Err(FetchError::Authentication("no credential supplied".to_string()));
        }

        let key = FetchKey::new(repo, credential, range);
        if let Some(batch) = self.cache.get(&key).await {
            metrics::CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
            debug!(identity = %credential.identity(), "fetch cache hit");
            return Ok(batch);
        }
        metrics::CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();
        debug!(identity = %credential.identity(), "fetch cache miss");

        let batch = Arc::new(self.fetch_uncached(repo, credential, range).await?);
        self.cache.put(key, batch.clone()).await;
        Ok(batch)
    }

    async fn fetch_uncached(
        &self,
        repo: &RepoRef,
        credential: &Credential,
        range: Option<DateRange>,
    ) -> Result<RecordBatch, FetchError> {
        // Repository lookup goes first so bad credentials and unknown
        // repositories fail before any listing.
        let stats = RepoStats::from_value(self.source.get_repository(repo, credential).await?)?;

        let raw_pulls = self.source.list_pull_requests(repo, credential).await?;
        let raw_issues: Vec<Value> = self
            .source
            .list_issues(repo, credential)
            .await?
            .into_iter()
            .filter(|raw| !RawRecord::is_pull_request_listing(raw))
            .collect();

        let pulls = normalize_batch(&raw_pulls, RecordKind::PullRequest);
        let issues = normalize_batch(&raw_issues, RecordKind::Issue);
        record_counts(RecordKind::PullRequest, &pulls);
        record_counts(RecordKind::Issue, &issues);

        let pull_requests = within(pulls.records, range);
        let issue_records = within(issues.records, range);
        let mut rejected = pulls.rejected;
        rejected.extend(issues.rejected);

        info!(
            pull_requests = pull_requests.len(),
            issues = issue_records.len(),
            rejected = rejected.len(),
            range = ?range,
            "fetched repository activity"
        );

        Ok(RecordBatch {
            stats,
            pull_requests,
            issues: issue_records,
            rejected,
        })
    }
}

fn within(records: Vec<ActivityRecord>, range: Option<DateRange>) -> Vec<ActivityRecord> {
    match range {
        Some(range) => records
            .into_iter()
            .filter(|record| range.contains(record.created_at.date()))
            .collect(),
        None => records,
    }
}

fn record_counts(kind: RecordKind, batch: &NormalizedBatch) {
    metrics::RECORDS_FETCHED_TOTAL
        .with_label_values(&[kind.as_str()])
        .inc_by(batch.records.len() as u64);
    metrics::RECORDS_REJECTED_TOTAL
        .with_label_values(&[kind.as_str()])
        .inc_by(batch.rejected.len() as u64);
}
