use std::sync::Arc;

use anyhow::Result;
use api::{build_router, ApiState};
use axum::Router;
use collector::{Credential, GithubRestSource, MetricsService};
use common::{config::AppConfig, logging};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging("info");
    let config = AppConfig::load()?;
    let source = GithubRestSource::new(&config.github)?;
    let default_credential = config
        .github
        .token
        .as_deref()
        .map(Credential::new)
        .filter(|credential| !credential.is_blank());
    if default_credential.is_none() {
        warn!("no github.token configured; requests must send an Authorization header");
    }
    let metrics_path: &'static str =
        Box::leak(config.observability.metrics_path.clone().into_boxed_str());
    let state = Arc::new(ApiState {
        service: MetricsService::new(Arc::new(source)),
        default_credential,
        metrics_path,
    });
    let app: Router = build_router(state);

    let addr: std::net::SocketAddr = config.api.bind.parse()?;
    info!("api listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
