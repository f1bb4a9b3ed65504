use analysis::AggregateRow;
use collector::RepositoryReport;
use serde::Serialize;

/// Headline numbers for a dashboard card row.
#[derive(Debug, Serialize)]
pub struct SummaryDto {
    pub repository: String,
    pub stars: i64,
    pub forks: i64,
    pub open_issues: i64,
    pub merged_pull_requests: usize,
    pub average_pr_cycle_hours: Option<f64>,
    pub closed_issues: usize,
    pub average_issue_close_hours: Option<f64>,
    pub unresolved_pull_requests: usize,
    pub unresolved_issues: usize,
    pub skipped_records: usize,
    pub top_contributor: Option<ContributorDto>,
}

#[derive(Debug, Serialize)]
pub struct ContributorDto {
    pub login: String,
    pub merged: usize,
    pub average_cycle_hours: f64,
}

impl From<&AggregateRow<String>> for ContributorDto {
    fn from(row: &AggregateRow<String>) -> Self {
        Self {
            login: row.key.clone(),
            merged: row.count,
            average_cycle_hours: row.mean_duration_hours,
        }
    }
}

impl From<&RepositoryReport> for SummaryDto {
    fn from(report: &RepositoryReport) -> Self {
        let metrics = &report.metrics;
        // Ties keep the alphabetically first login.
        let top_contributor = metrics
            .author_aggregate
            .iter()
            .fold(None::<&AggregateRow<String>>, |best, row| match best {
                Some(current) if current.count >= row.count => Some(current),
                _ => Some(row),
            })
            .map(ContributorDto::from);

        Self {
            repository: report.repository.clone(),
            stars: report.stats.stargazers_count,
            forks: report.stats.forks_count,
            open_issues: report.stats.open_issues_count,
            merged_pull_requests: metrics.pull_requests.resolved,
            average_pr_cycle_hours: metrics.pull_requests.mean_duration_hours,
            closed_issues: metrics.issues.resolved,
            average_issue_close_hours: metrics.issues.mean_duration_hours,
            unresolved_pull_requests: metrics.unresolved_counts.pull_requests,
            unresolved_issues: metrics.unresolved_counts.issues,
            skipped_records: metrics.skipped_records,
            top_contributor,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub summary: SummaryDto,
    #[serde(flatten)]
    pub report: RepositoryReport,
}

impl From<RepositoryReport> for MetricsResponse {
    fn from(report: RepositoryReport) -> Self {
        Self {
            summary: SummaryDto::from(&report),
            report,
        }
    }
}
