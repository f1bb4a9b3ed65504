use std::sync::Arc;

use analysis::to_csv_string;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use collector::{Credential, MetricsService, RepoRef, RepositoryReport};
use common::DateRange;
use prometheus::Encoder;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::dto::MetricsResponse;
use crate::error::{ApiError, ApiResult};

pub struct ApiState {
    pub service: MetricsService,
    /// Used when a request carries no `Authorization` header.
    pub default_credential: Option<Credential>,
    pub metrics_path: &'static str,
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    let metrics_path: &'static str = state.metrics_path;
    Router::new()
        .route("/healthz", get(healthz))
        .route("/repos/:owner/:name/metrics", get(repo_metrics))
        .route("/repos/:owner/:name/export/pulls.csv", get(export_pulls))
        .route("/repos/:owner/:name/export/issues.csv", get(export_issues))
        .route(metrics_path, get(metrics))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
}

impl RangeQuery {
    fn date_range(&self) -> ApiResult<Option<DateRange>> {
        Ok(DateRange::from_bounds(
            self.start.as_deref(),
            self.end.as_deref(),
        )?)
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip(state, headers))]
async fn repo_metrics(
    State(state): State<Arc<ApiState>>,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<RangeQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<MetricsResponse>> {
    let report = load_report(&state, owner, name, &query, &headers).await?;
    Ok(Json(MetricsResponse::from(report)))
}

#[instrument(skip(state, headers))]
async fn export_pulls(
    State(state): State<Arc<ApiState>>,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<RangeQuery>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let report = load_report(&state, owner, name, &query, &headers).await?;
    let body = to_csv_string(&report.metrics.resolved_pr_metrics)?;
    Ok(csv_response("analyzed_prs.csv", body))
}

#[instrument(skip(state, headers))]
async fn export_issues(
    State(state): State<Arc<ApiState>>,
    Path((owner, name)): Path<(String, String)>,
    Query(query): Query<RangeQuery>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let report = load_report(&state, owner, name, &query, &headers).await?;
    let body = to_csv_string(&report.metrics.resolved_issue_metrics)?;
    Ok(csv_response("analyzed_issues.csv", body))
}

#[instrument]
async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let content_type = encoder.format_type().to_string();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        buffer,
    ))
}

async fn load_report(
    state: &ApiState,
    owner: String,
    name: String,
    query: &RangeQuery,
    headers: &HeaderMap,
) -> ApiResult<RepositoryReport> {
    let range = query.date_range()?;
    let credential = credential_for(state, headers)?;
    let repo = RepoRef::new(owner, name);
    Ok(state.service.compute_metrics(&repo, &credential, range).await?)
}

fn credential_for(state: &ApiState, headers: &HeaderMap) -> ApiResult<Credential> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| ApiError::unauthorized("authorization header is not valid text"))?;
        return Credential::from_authorization(value)
            .ok_or_else(|| ApiError::unauthorized("expected `Bearer <token>` authorization"));
    }
    state
        .default_credential
        .clone()
        .ok_or_else(|| ApiError::unauthorized("no credential supplied"))
}

fn csv_response(filename: &str, body: String) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
}
