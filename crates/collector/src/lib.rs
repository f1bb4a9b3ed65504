pub mod cache;
pub mod client;
pub mod credential;
pub mod fetcher;
pub mod metrics;
pub mod service;

pub use cache::{FetchCache, FetchKey};
pub use client::{GithubRestSource, RecordSource, RepoRef, SourceError};
pub use credential::Credential;
pub use fetcher::{FetchError, RecordBatch, RecordFetcher, RepoStats};
pub use service::{MetricsService, RepositoryReport};
