use chrono::NaiveDate;
use normalizer::ActivityRecord;
use serde::Serialize;

use crate::aggregate::{aggregate, status_breakdown, AggregateRow, StatusBreakdown};
use crate::metrics::{compute, MetricsOutcome, ResolvedMetric};

/// "Nothing to show" conditions. These are not failures; the consumer
/// renders them as neutral notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyResultWarning {
    NoRecords,
    NoResolvedPullRequests,
    NoResolvedIssues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KindSummary {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub clock_skewed: usize,
    pub mean_duration_hours: Option<f64>,
    pub status: StatusBreakdown,
}

impl KindSummary {
    fn new(records: &[ActivityRecord], outcome: &MetricsOutcome) -> Self {
        Self {
            total: records.len(),
            resolved: outcome.resolved.len(),
            unresolved: outcome.unresolved,
            clock_skewed: outcome.clock_skewed,
            mean_duration_hours: outcome.mean_duration_hours(),
            status: status_breakdown(records),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnresolvedCounts {
    pub pull_requests: usize,
    pub issues: usize,
}

/// Everything derived from one fetched batch. `author_aggregate` and
/// `daily_aggregate` describe merged pull requests; the `issue_*` tables
/// describe closed issues.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsReport {
    pub resolved_pr_metrics: Vec<ResolvedMetric>,
    pub resolved_issue_metrics: Vec<ResolvedMetric>,
    pub author_aggregate: Vec<AggregateRow<String>>,
    pub daily_aggregate: Vec<AggregateRow<NaiveDate>>,
    pub issue_author_aggregate: Vec<AggregateRow<String>>,
    pub issue_daily_aggregate: Vec<AggregateRow<NaiveDate>>,
    pub unresolved_counts: UnresolvedCounts,
    pub pull_requests: KindSummary,
    pub issues: KindSummary,
    pub skipped_records: usize,
    pub warnings: Vec<EmptyResultWarning>,
}

impl MetricsReport {
    pub fn build(
        pull_requests: &[ActivityRecord],
        issues: &[ActivityRecord],
        skipped_records: usize,
    ) -> Self {
        let pr_outcome = compute(pull_requests);
        let issue_outcome = compute(issues);
        let pr_tables = aggregate(&pr_outcome.resolved);
        let issue_tables = aggregate(&issue_outcome.resolved);

        let mut warnings = Vec::new();
        if pull_requests.is_empty() && issues.is_empty() {
            warnings.push(EmptyResultWarning::NoRecords);
        } else {
            if pr_outcome.resolved.is_empty() {
                warnings.push(EmptyResultWarning::NoResolvedPullRequests);
            }
            if issue_outcome.resolved.is_empty() {
                warnings.push(EmptyResultWarning::NoResolvedIssues);
            }
        }

        Self {
            pull_requests: KindSummary::new(pull_requests, &pr_outcome),
            issues: KindSummary::new(issues, &issue_outcome),
            unresolved_counts: UnresolvedCounts {
                pull_requests: pr_outcome.unresolved,
                issues: issue_outcome.unresolved,
            },
            author_aggregate: pr_tables.by_author,
            daily_aggregate: pr_tables.by_day,
            issue_author_aggregate: issue_tables.by_author,
            issue_daily_aggregate: issue_tables.by_day,
            resolved_pr_metrics: pr_outcome.resolved,
            resolved_issue_metrics: issue_outcome.resolved,
            skipped_records,
            warnings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.contains(&EmptyResultWarning::NoRecords)
    }
}
