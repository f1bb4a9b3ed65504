use std::collections::HashMap;
use std::sync::Arc;

use common::DateRange;
use tokio::sync::RwLock;

use crate::client::RepoRef;
use crate::credential::Credential;
use crate::fetcher::RecordBatch;

/// Exact fetch parameters. `range: None` (unbounded) never matches an
/// explicit range, even one spanning every record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub repository: RepoRef,
    pub credential: String,
    pub range: Option<DateRange>,
}

impl FetchKey {
    pub fn new(repository: &RepoRef, credential: &Credential, range: Option<DateRange>) -> Self {
        Self {
            repository: repository.clone(),
            credential: credential.identity().to_string(),
            range,
        }
    }
}

/// Process-lifetime memo of normalized batches. Entries are never evicted.
/// Concurrent misses on the same key may both populate it; the batch is a
/// pure function of the key so whichever write lands last is kept.
#[derive(Clone, Default)]
pub struct FetchCache {
    inner: Arc<RwLock<HashMap<FetchKey, Arc<RecordBatch>>>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &FetchKey) -> Option<Arc<RecordBatch>> {
        let guard = self.inner.read().await;
        guard.get(key).cloned()
    }

    pub async fn put(&self, key: FetchKey, batch: Arc<RecordBatch>) {
        let mut guard = self.inner.write().await;
        guard.insert(key, batch);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
