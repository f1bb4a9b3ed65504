//! Tabular export of records.
//!
//! One row per record, comma-delimited UTF-8 with a header row.
//! Timestamps are ISO-8601 in naive UTC; absent timestamps are empty
//! fields. The full-listing export leaves `duration_hours` empty for
//! records without a resolution sample.

use std::io::{Read, Write};

use chrono::NaiveDateTime;
use normalizer::{ActivityRecord, RecordKind, RecordState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::{resolve, Resolution, ResolvedMetric};

pub const HEADERS: [&str; 9] = [
    "id",
    "kind",
    "title",
    "state",
    "created_at",
    "closed_at",
    "merged_at",
    "author",
    "duration_hours",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct ResolvedRow {
    id: i64,
    kind: RecordKind,
    title: String,
    state: RecordState,
    created_at: NaiveDateTime,
    closed_at: Option<NaiveDateTime>,
    merged_at: Option<NaiveDateTime>,
    author: String,
    duration_hours: f64,
}

impl From<&ResolvedMetric> for ResolvedRow {
    fn from(metric: &ResolvedMetric) -> Self {
        let record = &metric.record;
        Self {
            id: record.id,
            kind: record.kind,
            title: record.title.clone(),
            state: record.state,
            created_at: record.created_at,
            closed_at: record.closed_at,
            merged_at: record.merged_at,
            author: record.author.clone(),
            duration_hours: metric.duration_hours,
        }
    }
}

/// Row shape for the full listing; same columns as `ResolvedRow`.
#[derive(Debug, Serialize)]
struct RecordRow<'a> {
    id: i64,
    kind: RecordKind,
    title: &'a str,
    state: RecordState,
    created_at: NaiveDateTime,
    closed_at: Option<NaiveDateTime>,
    merged_at: Option<NaiveDateTime>,
    author: &'a str,
    duration_hours: Option<f64>,
}

impl<'a> From<&'a ActivityRecord> for RecordRow<'a> {
    fn from(record: &'a ActivityRecord) -> Self {
        let duration_hours = match resolve(record) {
            Resolution::Resolved(hours) => Some(hours),
            Resolution::Unresolved | Resolution::ClockSkew => None,
        };
        Self {
            id: record.id,
            kind: record.kind,
            title: &record.title,
            state: record.state,
            created_at: record.created_at,
            closed_at: record.closed_at,
            merged_at: record.merged_at,
            author: &record.author,
            duration_hours,
        }
    }
}

impl From<ResolvedRow> for ResolvedMetric {
    fn from(row: ResolvedRow) -> Self {
        Self {
            record: ActivityRecord {
                id: row.id,
                kind: row.kind,
                title: row.title,
                state: row.state,
                created_at: row.created_at,
                closed_at: row.closed_at,
                merged_at: row.merged_at,
                author: row.author,
            },
            duration_hours: row.duration_hours,
        }
    }
}

fn write_rows<W, T, I>(rows: I, writer: W) -> Result<(), ExportError>
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    // Header is written by hand so an empty table still carries it.
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(HEADERS)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_csv<W: Write>(metrics: &[ResolvedMetric], writer: W) -> Result<(), ExportError> {
    write_rows(metrics.iter().map(ResolvedRow::from), writer)
}

pub fn to_csv_string(metrics: &[ResolvedMetric]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(metrics, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Writes every record, resolved or not.
pub fn write_records_csv<W: Write>(
    records: &[ActivityRecord],
    writer: W,
) -> Result<(), ExportError> {
    write_rows(records.iter().map(RecordRow::from), writer)
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ResolvedMetric>, ExportError> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut metrics = Vec::new();
    for row in csv.deserialize::<ResolvedRow>() {
        metrics.push(row?.into());
    }
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::compute;
    use chrono::{Duration, NaiveDate};

    fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn sample() -> Vec<ResolvedMetric> {
        let records = vec![
            ActivityRecord {
                id: 41,
                kind: RecordKind::PullRequest,
                title: "Fix \"quoted\", comma title".into(),
                state: RecordState::Closed,
                created_at: ts(1, 8, 0),
                closed_at: Some(ts(2, 9, 20)),
                merged_at: Some(ts(2, 9, 20)),
                author: "alice".into(),
            },
            ActivityRecord {
                id: 42,
                kind: RecordKind::PullRequest,
                title: "Tiny".into(),
                state: RecordState::Closed,
                created_at: ts(3, 0, 0),
                closed_at: None,
                merged_at: Some(ts(3, 0, 0) + Duration::milliseconds(1_234_567)),
                author: "bob".into(),
            },
        ];
        compute(&records).resolved
    }

    #[test]
    fn export_round_trips() {
        let metrics = sample();
        let text = to_csv_string(&metrics).unwrap();
        let parsed = read_csv(text.as_bytes()).unwrap();

        assert_eq!(parsed.len(), metrics.len());
        for (original, parsed) in metrics.iter().zip(&parsed) {
            assert_eq!(parsed.record.id, original.record.id);
            assert_eq!(parsed.record.author, original.record.author);
            assert_eq!(parsed.duration_hours, original.duration_hours);
            assert_eq!(parsed.record.created_at, original.record.created_at);
            assert_eq!(parsed.record.merged_at, original.record.merged_at);
            assert_eq!(parsed.record.closed_at, original.record.closed_at);
        }
        assert_eq!(parsed, metrics);
    }

    #[test]
    fn header_and_iso_timestamps() {
        let text = to_csv_string(&sample()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), HEADERS.join(","));
        let first = lines.next().unwrap();
        assert!(first.starts_with("41,pull_request,\"Fix \"\"quoted\"\", comma title\",closed,"));
        assert!(first.contains("2024-02-01T08:00:00"));
    }

    #[test]
    fn empty_table_still_has_header() {
        let text = to_csv_string(&[]).unwrap();
        assert_eq!(text.trim_end(), HEADERS.join(","));
        assert!(read_csv(text.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn full_listing_keeps_unresolved_records() {
        let mut records: Vec<ActivityRecord> = sample().into_iter().map(|m| m.record).collect();
        records.push(ActivityRecord {
            id: 43,
            kind: RecordKind::PullRequest,
            title: "Still open".into(),
            state: RecordState::Open,
            created_at: ts(4, 0, 0),
            closed_at: None,
            merged_at: None,
            author: "carol".into(),
        });

        let mut buf = Vec::new();
        write_records_csv(&records, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], HEADERS.join(","));
        assert!(lines[1].contains(",alice,25.33"));
        assert_eq!(lines[3], "43,pull_request,Still open,open,2024-02-04T00:00:00,,,carol,");
    }

    #[test]
    fn absent_timestamps_are_empty_fields() {
        let text = to_csv_string(&sample()).unwrap();
        let second = text.lines().nth(2).unwrap();
        assert!(second.contains(",closed,2024-02-03T00:00:00,,2024-02-03T00:20:34.567,bob,"));
    }
}
