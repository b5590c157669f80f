//! Sentry exporter binary.
//!
//! Loads config, probes the Sentry API once, then serves `/metrics`.

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use sentrex_core::error::{Result, SentrexError};
use sentrex_exporter::{app_state::AppState, config, router, source::SentryApi};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "sentrex exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load()?;
    let listen: SocketAddr = cfg
        .http
        .listen
        .parse()
        .map_err(|e| SentrexError::Config(format!("http.listen must be a valid SocketAddr: {e}")))?;

    let api = SentryApi::from_config(&cfg)?;
    let orgs = api.organizations().await?;
    tracing::info!(visible_orgs = orgs.len(), org = %cfg.sentry.org_slug, "sentry api reachable");

    let state = AppState::new(cfg, api);
    let app = router::build_router(state);

    tracing::info!(%listen, "sentrex-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| SentrexError::Internal(format!("server failed: {e}")))
}
