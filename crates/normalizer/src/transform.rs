use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::models::{ActivityRecord, RecordKind, RecordState};
use crate::payloads::RawRecord;

/// Login the hosting service shows for deleted accounts.
const GHOST_LOGIN: &str = "ghost";

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not a valid timestamp: {value}")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("unreadable payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {kind} {}: {reason}", id_label(.id))]
pub struct MalformedRecordError {
    pub kind: RecordKind,
    pub id: Option<i64>,
    pub reason: MalformedReason,
}

fn id_label(id: &Option<i64>) -> String {
    match id {
        Some(id) => format!("#{id}"),
        None => "record".to_string(),
    }
}

/// Result of normalizing one listing: the usable records plus every record
/// that had to be dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<ActivityRecord>,
    pub rejected: Vec<MalformedRecordError>,
}

/// Parses a timestamp into naive UTC wall-clock time. Values carrying an
/// offset are converted to UTC; values without one are taken as UTC.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.naive_utc());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Some(dt.naive_utc());
        }
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
}

fn optional_timestamp(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Option<NaiveDateTime>, MalformedReason> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => {
            parse_timestamp(s)
                .map(Some)
                .ok_or_else(|| MalformedReason::InvalidTimestamp {
                    field,
                    value: s.clone(),
                })
        }
        Some(other) => Err(MalformedReason::InvalidTimestamp {
            field,
            value: other.to_string(),
        }),
    }
}

pub fn normalize_record(
    raw: &Value,
    kind: RecordKind,
) -> Result<ActivityRecord, MalformedRecordError> {
    let id = raw.get("number").and_then(Value::as_i64);
    let malformed = |reason: MalformedReason| MalformedRecordError { kind, id, reason };

    let payload = RawRecord::deserialize(raw)
        .map_err(|err| malformed(MalformedReason::InvalidPayload(err.to_string())))?;
    let number = payload
        .number
        .ok_or_else(|| malformed(MalformedReason::MissingField("number")))?;

    let created_at = optional_timestamp(payload.created_at.as_ref(), "created_at")
        .map_err(&malformed)?
        .ok_or_else(|| malformed(MalformedReason::MissingField("created_at")))?;
    let closed_at =
        optional_timestamp(payload.closed_at.as_ref(), "closed_at").map_err(&malformed)?;
    let merged_at = match kind {
        RecordKind::PullRequest => {
            optional_timestamp(payload.merged_at.as_ref(), "merged_at").map_err(&malformed)?
        }
        RecordKind::Issue => None,
    };

    let state = if merged_at.is_some() {
        RecordState::Closed
    } else {
        payload
            .state
            .as_deref()
            .and_then(RecordState::parse)
            .unwrap_or(if closed_at.is_some() {
                RecordState::Closed
            } else {
                RecordState::Open
            })
    };

    if closed_at.is_some_and(|ts| ts < created_at) || merged_at.is_some_and(|ts| ts < created_at)
    {
        warn!(
            kind = %kind,
            id = number,
            created_at = %created_at,
            "record resolved before it was created"
        );
    }

    let author = payload
        .user
        .and_then(|user| user.login)
        .filter(|login| !login.is_empty())
        .unwrap_or_else(|| GHOST_LOGIN.to_string());

    Ok(ActivityRecord {
        id: number,
        kind,
        title: payload.title.unwrap_or_default(),
        state,
        created_at,
        closed_at,
        merged_at,
        author,
    })
}

/// Normalizes a whole listing. A bad record is dropped and reported in
/// `rejected`; it never aborts the batch.
pub fn normalize_batch(raws: &[Value], kind: RecordKind) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for raw in raws {
        match normalize_record(raw, kind) {
            Ok(record) => batch.records.push(record),
            Err(err) => {
                warn!(kind = %kind, id = ?err.id, reason = %err.reason, "skipping malformed record");
                batch.rejected.push(err);
            }
        }
    }
    batch
}
