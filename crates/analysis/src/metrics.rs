use chrono::NaiveDateTime;
use normalizer::ActivityRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SECONDS_PER_HOUR: f64 = 3_600.0;

/// A record together with the hours it took to reach its resolution
/// (merge for pull requests, close for issues).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedMetric {
    pub record: ActivityRecord,
    pub duration_hours: f64,
}

impl ResolvedMetric {
    pub fn resolved_at(&self) -> NaiveDateTime {
        // Only constructed by `resolve`, which requires the timestamp.
        self.record
            .resolved_at()
            .unwrap_or(self.record.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Resolved(f64),
    Unresolved,
    /// Resolution timestamp precedes creation.
    ClockSkew,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsOutcome {
    pub resolved: Vec<ResolvedMetric>,
    /// Records without a resolution sample, including `clock_skewed` ones.
    pub unresolved: usize,
    pub clock_skewed: usize,
}

impl MetricsOutcome {
    pub fn mean_duration_hours(&self) -> Option<f64> {
        if self.resolved.is_empty() {
            return None;
        }
        let total: f64 = self.resolved.iter().map(|m| m.duration_hours).sum();
        Some(total / self.resolved.len() as f64)
    }
}

pub fn resolve(record: &ActivityRecord) -> Resolution {
    let Some(resolved_at) = record.resolved_at() else {
        return Resolution::Unresolved;
    };
    if resolved_at < record.created_at {
        return Resolution::ClockSkew;
    }
    match (resolved_at - record.created_at).to_std() {
        Ok(elapsed) => Resolution::Resolved(elapsed.as_secs_f64() / SECONDS_PER_HOUR),
        Err(_) => Resolution::ClockSkew,
    }
}

/// Resolves every record independently, preserving input order.
pub fn compute(records: &[ActivityRecord]) -> MetricsOutcome {
    let mut outcome = MetricsOutcome::default();
    for record in records {
        match resolve(record) {
            Resolution::Resolved(duration_hours) => outcome.resolved.push(ResolvedMetric {
                record: record.clone(),
                duration_hours,
            }),
            Resolution::Unresolved => outcome.unresolved += 1,
            Resolution::ClockSkew => {
                debug!(kind = %record.kind, id = record.id, "rejecting negative duration");
                outcome.unresolved += 1;
                outcome.clock_skewed += 1;
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use normalizer::{RecordKind, RecordState};

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn pr(id: i64, merged_at: Option<NaiveDateTime>) -> ActivityRecord {
        ActivityRecord {
            id,
            kind: RecordKind::PullRequest,
            title: format!("PR {id}"),
            state: if merged_at.is_some() {
                RecordState::Closed
            } else {
                RecordState::Open
            },
            created_at: ts(1, 0),
            closed_at: merged_at,
            merged_at,
            author: "alice".into(),
        }
    }

    fn issue(id: i64, created_at: NaiveDateTime, closed_at: Option<NaiveDateTime>) -> ActivityRecord {
        ActivityRecord {
            id,
            kind: RecordKind::Issue,
            title: format!("Issue {id}"),
            state: if closed_at.is_some() {
                RecordState::Closed
            } else {
                RecordState::Open
            },
            created_at,
            closed_at,
            merged_at: None,
            author: "bob".into(),
        }
    }

    #[test]
    fn three_pull_requests_scenario() {
        let records = vec![pr(1, Some(ts(2, 0))), pr(2, Some(ts(1, 12))), pr(3, None)];
        let outcome = compute(&records);
        assert_eq!(outcome.resolved.len(), 2);
        assert_eq!(outcome.unresolved, 1);
        assert_eq!(outcome.clock_skewed, 0);
        assert_eq!(outcome.resolved[0].duration_hours, 24.0);
        assert_eq!(outcome.resolved[1].duration_hours, 12.0);
        assert_eq!(outcome.mean_duration_hours(), Some(18.0));
    }

    #[test]
    fn closed_without_merge_is_unresolved() {
        let mut abandoned = pr(4, None);
        abandoned.state = RecordState::Closed;
        abandoned.closed_at = Some(ts(3, 0));
        assert_eq!(resolve(&abandoned), Resolution::Unresolved);
    }

    #[test]
    fn issue_closed_before_creation_is_rejected() {
        let corrupt = issue(8, ts(5, 0), Some(ts(4, 0)));
        let outcome = compute(&[corrupt]);
        assert!(outcome.resolved.is_empty());
        assert_eq!(outcome.unresolved, 1);
        assert_eq!(outcome.clock_skewed, 1);
    }

    #[test]
    fn durations_are_never_negative() {
        let base = ts(10, 0);
        let records: Vec<_> = (-48i64..=48)
            .map(|offset| issue(offset, base, Some(base + Duration::hours(offset))))
            .collect();
        let outcome = compute(&records);
        assert!(outcome.resolved.iter().all(|m| m.duration_hours >= 0.0));
        assert_eq!(outcome.resolved.len(), 49);
        assert_eq!(outcome.clock_skewed, 48);
    }

    #[test]
    fn output_preserves_input_order() {
        let records = vec![
            issue(30, ts(1, 0), Some(ts(1, 5))),
            issue(10, ts(1, 0), None),
            issue(20, ts(1, 0), Some(ts(1, 1))),
        ];
        let ids: Vec<_> = compute(&records)
            .resolved
            .iter()
            .map(|m| m.record.id)
            .collect();
        assert_eq!(ids, vec![30, 20]);
    }

    #[test]
    fn fractional_hours_are_kept() {
        let record = issue(1, ts(1, 0), Some(ts(1, 0) + Duration::minutes(90)));
        assert_eq!(resolve(&record), Resolution::Resolved(1.5));
    }

    #[test]
    fn sub_millisecond_skew_is_rejected() {
        let created = ts(1, 0);
        let record = issue(1, created, Some(created - Duration::microseconds(500)));
        assert_eq!(resolve(&record), Resolution::ClockSkew);
        let outcome = compute(&[record]);
        assert!(outcome.resolved.is_empty());
        assert_eq!(outcome.clock_skewed, 1);
    }

    #[test]
    fn sub_millisecond_precision_is_kept() {
        let created = ts(1, 0);
        let closed = created + Duration::seconds(3600) + Duration::microseconds(900);
        let Resolution::Resolved(hours) = resolve(&issue(1, created, Some(closed))) else {
            panic!("expected a resolved duration");
        };
        assert!((hours - 3600.0009 / 3600.0).abs() < 1e-12);
        assert!(hours > 1.0);
    }

    #[test]
    fn empty_input_has_no_mean() {
        let outcome = compute(&[]);
        assert!(outcome.resolved.is_empty());
        assert_eq!(outcome.unresolved, 0);
        assert_eq!(outcome.mean_duration_hours(), None);
    }
}
