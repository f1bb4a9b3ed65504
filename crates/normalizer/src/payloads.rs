use serde::Deserialize;
use serde_json::Value;

/// Listing entry as returned by the hosting API. Timestamps stay untyped
/// here so the normalizer can report which one was unusable.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub number: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub closed_at: Option<Value>,
    #[serde(default)]
    pub merged_at: Option<Value>,
    #[serde(default)]
    pub user: Option<UserRef>,
}

impl RawRecord {
    /// Issue listings also return pull requests; those carry a
    /// `pull_request` object.
    pub fn is_pull_request_listing(raw: &Value) -> bool {
        raw.get("pull_request").is_some_and(|v| !v.is_null())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub login: Option<String>,
}
