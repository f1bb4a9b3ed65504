use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    PullRequest,
    Issue,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::PullRequest => "pull_request",
            RecordKind::Issue => "issue",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Open,
    Closed,
}

impl RecordState {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "open" => Some(RecordState::Open),
            "closed" => Some(RecordState::Closed),
            _ => None,
        }
    }
}

/// One pull request or issue with timestamps in naive UTC wall-clock time.
///
/// `merged_at` is only ever set for pull requests, and implies
/// `state == Closed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityRecord {
    pub id: i64,
    pub kind: RecordKind,
    pub title: String,
    pub state: RecordState,
    pub created_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
    pub merged_at: Option<NaiveDateTime>,
    pub author: String,
}

impl ActivityRecord {
    /// The terminal timestamp that counts as resolution for this kind:
    /// merge for pull requests, close for issues.
    pub fn resolved_at(&self) -> Option<NaiveDateTime> {
        match self.kind {
            RecordKind::PullRequest => self.merged_at,
            RecordKind::Issue => self.closed_at,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}
