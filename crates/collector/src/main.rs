use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use analysis::{write_csv, write_records_csv, ResolvedMetric};
use normalizer::ActivityRecord;
use anyhow::Result;
use collector::{Credential, GithubRestSource, MetricsService, RepoRef, RepositoryReport};
use common::{config::AppConfig, logging, AppError};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("info");
    run().await?;
    Ok(())
}

async fn run() -> common::Result<()> {
    let config = AppConfig::load()?;
    let secret = config
        .github
        .token
        .clone()
        .ok_or(AppError::Missing("github.token"))?;
    let target = config.target.clone().ok_or(AppError::Missing("target"))?;
    let range = target
        .date_range()
        .map_err(|err| AppError::Other(err.into()))?;

    let source = GithubRestSource::new(&config.github).map_err(AppError::http)?;
    let service = MetricsService::new(Arc::new(source));
    let repo = RepoRef::new(target.owner, target.name);
    info!(repo = %repo, range = ?range, "collecting repository activity");

    let credential = Credential::new(secret);
    let report = service
        .compute_metrics(&repo, &credential, range)
        .await
        .map_err(AppError::http)?;
    log_summary(&report);

    std::fs::create_dir_all(&config.export.dir)?;
    export(
        &config.export.dir.join("analyzed_prs.csv"),
        &report.metrics.resolved_pr_metrics,
    )?;
    export(
        &config.export.dir.join("analyzed_issues.csv"),
        &report.metrics.resolved_issue_metrics,
    )?;

    if config.export.all_records {
        let batch = service
            .fetch_records(&repo, &credential, range)
            .await
            .map_err(AppError::http)?;
        export_all(
            &config.export.dir.join("github_pull_requests.csv"),
            &batch.pull_requests,
        )?;
        export_all(&config.export.dir.join("github_issues.csv"), &batch.issues)?;
    }
    Ok(())
}

fn log_summary(report: &RepositoryReport) {
    let metrics = &report.metrics;
    info!(
        repo = %report.repository,
        stars = report.stats.stargazers_count,
        forks = report.stats.forks_count,
        open_issues = report.stats.open_issues_count,
        "repository stats"
    );
    match metrics.pull_requests.mean_duration_hours {
        Some(hours) => info!(
            merged = metrics.pull_requests.resolved,
            unresolved = metrics.unresolved_counts.pull_requests,
            "average PR cycle time: {hours:.2} hours"
        ),
        None => warn!("no merged pull requests found to analyze cycle time"),
    }
    match metrics.issues.mean_duration_hours {
        Some(hours) => info!(
            closed = metrics.issues.resolved,
            unresolved = metrics.unresolved_counts.issues,
            "average issue close time: {hours:.2} hours"
        ),
        None => warn!("no closed issues found to analyze"),
    }
    if !metrics.warnings.is_empty() {
        warn!(warnings = ?metrics.warnings, "report has empty sections");
    }
    if metrics.skipped_records > 0 {
        warn!(skipped = metrics.skipped_records, "malformed records were skipped");
    }
}

fn export(path: &Path, metrics: &[ResolvedMetric]) -> common::Result<()> {
    if metrics.is_empty() {
        warn!(path = %path.display(), "nothing to export");
        return Ok(());
    }
    let file = File::create(path)?;
    write_csv(metrics, BufWriter::new(file)).map_err(AppError::export)?;
    info!(path = %path.display(), rows = metrics.len(), "export written");
    Ok(())
}

fn export_all(path: &Path, records: &[ActivityRecord]) -> common::Result<()> {
    let file = File::create(path)?;
    write_records_csv(records, BufWriter::new(file)).map_err(AppError::export)?;
    info!(path = %path.display(), rows = records.len(), "full listing written");
    Ok(())
}
