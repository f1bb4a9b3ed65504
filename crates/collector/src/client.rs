use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use common::config::GithubConfig;
use http::{header, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::credential::Credential;
use crate::metrics;

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("credential rejected for {endpoint}")]
    Authentication { endpoint: String },
    #[error("repository {0} not found")]
    RepositoryNotFound(String),
    #[error("github api error: {status} for {endpoint}")]
    Http {
        status: StatusCode,
        endpoint: String,
    },
    #[error("unexpected response for {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),
}

impl SourceError {
    pub fn transport(err: impl Into<anyhow::Error>) -> Self {
        Self::Transport(err.into())
    }
}

/// Where raw pull request and issue listings come from. Each listing
/// method enumerates every page (`state=all`) before returning.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn get_repository(
        &self,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<Value, SourceError>;

    async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<Vec<Value>, SourceError>;

    async fn list_issues(
        &self,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<Vec<Value>, SourceError>;
}

pub struct GithubRestSource {
    client: reqwest::Client,
    base: Url,
    page_size: u32,
}

impl GithubRestSource {
    pub fn new(config: &GithubConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            base: Url::parse(&config.api_base)?,
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
        })
    }

    #[instrument(skip(self, credential), fields(url = %url))]
    async fn get_json(
        &self,
        url: Url,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<Value, SourceError> {
        let endpoint = url.path().trim_start_matches('/').to_string();
        debug!(endpoint = %endpoint, identity = %credential.identity(), "dispatching GitHub request");
        let response = self
            .client
            .get(url)
            .bearer_auth(credential.secret())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(SourceError::transport)?;

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(SourceError::transport)?;
            serde_json::from_slice(&body).map_err(|err| SourceError::Decode {
                endpoint,
                message: err.to_string(),
            })
        } else if status == StatusCode::UNAUTHORIZED {
            Err(SourceError::Authentication { endpoint })
        } else if status == StatusCode::NOT_FOUND {
            Err(SourceError::RepositoryNotFound(repo.to_string()))
        } else {
            Err(SourceError::Http { status, endpoint })
        }
    }

    async fn list_all(
        &self,
        resource: &'static str,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<Vec<Value>, SourceError> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let path = format!("repos/{}/{}/{resource}", repo.owner, repo.name);
            let mut url = self.base.join(&path).map_err(SourceError::transport)?;
            url.query_pairs_mut()
                .append_pair("state", "all")
                .append_pair("per_page", &self.page_size.to_string())
                .append_pair("page", &page.to_string());

            let batch = match self.get_json(url, repo, credential).await? {
                Value::Array(batch) => batch,
                Value::Null => Vec::new(),
                _ => {
                    return Err(SourceError::Decode {
                        endpoint: path,
                        message: "expected array response".to_string(),
                    })
                }
            };
            let len = batch.len();
            items.extend(batch);
            if len < self.page_size as usize {
                break;
            }
            page += 1;
        }
        debug!(resource, repo = %repo, count = items.len(), pages = page, "listing complete");
        Ok(items)
    }
}

/// Records request count and latency for one logical call.
async fn observed<T, F>(endpoint: &'static str, call: F) -> Result<T, SourceError>
where
    F: std::future::Future<Output = Result<T, SourceError>>,
{
    let started = Instant::now();
    let result = call.await;
    let outcome = if result.is_ok() { "success" } else { "error" };
    metrics::FETCH_REQUESTS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
    metrics::FETCH_LATENCY_SECONDS
        .with_label_values(&[endpoint])
        .observe(started.elapsed().as_secs_f64());
    result
}

#[async_trait]
impl RecordSource for GithubRestSource {
    async fn get_repository(
        &self,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<Value, SourceError> {
        observed("repo", async {
            let path = format!("repos/{}/{}", repo.owner, repo.name);
            let url = self.base.join(&path).map_err(SourceError::transport)?;
            self.get_json(url, repo, credential).await
        })
        .await
    }

    async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<Vec<Value>, SourceError> {
        observed("pulls", self.list_all("pulls", repo, credential)).await
    }

    async fn list_issues(
        &self,
        repo: &RepoRef,
        credential: &Credential,
    ) -> Result<Vec<Value>, SourceError> {
        observed("issues", self.list_all("issues", repo, credential)).await
    }
}
