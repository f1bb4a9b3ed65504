use std::collections::BTreeMap;

use chrono::NaiveDate;
use normalizer::{ActivityRecord, RecordState};
use serde::{Deserialize, Serialize};

use crate::metrics::ResolvedMetric;

/// One group of resolved records: how many there are and their mean
/// duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateRow<K> {
    pub key: K,
    pub count: usize,
    pub mean_duration_hours: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Aggregates {
    pub by_author: Vec<AggregateRow<String>>,
    /// Ascending by date.
    pub by_day: Vec<AggregateRow<NaiveDate>>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusBreakdown {
    pub open: usize,
    /// Closed without being merged.
    pub closed: usize,
    pub merged: usize,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    total_hours: f64,
}

impl Accumulator {
    fn add(&mut self, hours: f64) {
        self.count += 1;
        self.total_hours += hours;
    }

    fn into_row<K>(self, key: K) -> AggregateRow<K> {
        AggregateRow {
            key,
            count: self.count,
            mean_duration_hours: self.total_hours / self.count as f64,
        }
    }
}

fn group_by<K, F>(metrics: &[ResolvedMetric], key_of: F) -> Vec<AggregateRow<K>>
where
    K: Ord,
    F: Fn(&ResolvedMetric) -> K,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for metric in metrics {
        groups
            .entry(key_of(metric))
            .or_default()
            .add(metric.duration_hours);
    }
    groups
        .into_iter()
        .map(|(key, acc)| acc.into_row(key))
        .collect()
}

/// Groups by author. Callers must not rely on row order.
pub fn by_author(metrics: &[ResolvedMetric]) -> Vec<AggregateRow<String>> {
    group_by(metrics, |m| m.record.author.clone())
}

/// Groups by the calendar date of the resolution timestamp, ascending.
pub fn by_day(metrics: &[ResolvedMetric]) -> Vec<AggregateRow<NaiveDate>> {
    group_by(metrics, |m| m.resolved_at().date())
}

pub fn aggregate(metrics: &[ResolvedMetric]) -> Aggregates {
    Aggregates {
        by_author: by_author(metrics),
        by_day: by_day(metrics),
    }
}

pub fn status_breakdown(records: &[ActivityRecord]) -> StatusBreakdown {
    records
        .iter()
        .fold(StatusBreakdown::default(), |mut acc, record| {
            if record.is_merged() {
                acc.merged += 1;
            } else {
                match record.state {
                    RecordState::Open => acc.open += 1,
                    RecordState::Closed => acc.closed += 1,
                }
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use normalizer::RecordKind;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn merged(id: i64, author: &str, created: NaiveDateTime, merged: NaiveDateTime) -> ResolvedMetric {
        let duration_hours = (merged - created).num_minutes() as f64 / 60.0;
        ResolvedMetric {
            record: ActivityRecord {
                id,
                kind: RecordKind::PullRequest,
                title: String::new(),
                state: RecordState::Closed,
                created_at: created,
                closed_at: Some(merged),
                merged_at: Some(merged),
                author: author.into(),
            },
            duration_hours,
        }
    }

    #[test]
    fn empty_input_yields_empty_tables() {
        let aggregates = aggregate(&[]);
        assert!(aggregates.by_author.is_empty());
        assert!(aggregates.by_day.is_empty());
    }

    #[test]
    fn author_rows_carry_count_and_mean() {
        let metrics = vec![
            merged(1, "alice", ts(1, 0), ts(2, 0)),
            merged(2, "bob", ts(1, 0), ts(1, 6)),
            merged(3, "alice", ts(1, 0), ts(1, 12)),
        ];
        let rows = by_author(&metrics);
        let alice = rows.iter().find(|r| r.key == "alice").unwrap();
        let bob = rows.iter().find(|r| r.key == "bob").unwrap();
        assert_eq!(alice.count, 2);
        assert_eq!(alice.mean_duration_hours, 18.0);
        assert_eq!(bob.count, 1);
        assert_eq!(bob.mean_duration_hours, 6.0);
    }

    #[test]
    fn day_rows_are_ascending_for_any_input_order() {
        let mut metrics = vec![
            merged(1, "a", ts(1, 0), ts(9, 3)),
            merged(2, "b", ts(1, 0), ts(2, 3)),
            merged(3, "c", ts(1, 0), ts(5, 3)),
            merged(4, "d", ts(1, 0), ts(2, 20)),
            merged(5, "e", ts(1, 0), ts(7, 1)),
        ];
        for rotation in 0..metrics.len() {
            metrics.rotate_left(rotation);
            let rows = by_day(&metrics);
            assert!(rows.windows(2).all(|w| w[0].key <= w[1].key));
            assert_eq!(rows.len(), 4);
        }
        metrics.reverse();
        let rows = by_day(&metrics);
        assert!(rows.windows(2).all(|w| w[0].key <= w[1].key));
    }

    #[test]
    fn day_bucket_uses_resolution_date() {
        let metrics = vec![
            merged(1, "a", ts(1, 0), ts(3, 10)),
            merged(2, "b", ts(2, 0), ts(3, 23)),
        ];
        let rows = by_day(&metrics);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(rows[0].count, 2);
    }

    #[test]
    fn breakdown_separates_merged_from_closed() {
        let mut open = merged(1, "a", ts(1, 0), ts(2, 0)).record;
        open.merged_at = None;
        open.closed_at = None;
        open.state = RecordState::Open;
        let mut abandoned = open.clone();
        abandoned.state = RecordState::Closed;
        abandoned.closed_at = Some(ts(3, 0));
        let done = merged(2, "b", ts(1, 0), ts(2, 0)).record;

        let breakdown = status_breakdown(&[open, abandoned, done]);
        assert_eq!(
            breakdown,
            StatusBreakdown {
                open: 1,
                closed: 1,
                merged: 1
            }
        );
    }
}
