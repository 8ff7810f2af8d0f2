use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use school_api_client::{
    SchoolApiClient, config::Config as ClientConfig, http_client::ReqwestSchoolApiClient,
};
use school_planner::{PlannerConfig, PlannerService, routes};

/// Log filter from `PLANNER_LOG_LEVEL`, then `RUST_LOG`, then `info`.
fn log_filter_from<F>(get: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get("PLANNER_LOG_LEVEL")
        .or_else(|| get("RUST_LOG"))
        .unwrap_or_else(|| "info".to_string())
}

/// Body limit and request timeout around the planner routes.
fn with_limits(app: Router, config: &PlannerConfig) -> Router {
    app.layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
}


#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let log_env = log_filter_from(|k| std::env::var(k).ok());
    let env_filter = tracing_subscriber::EnvFilter::try_new(log_env.clone())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!(%log_env, "school_planner:http: log filter");

    let handle = PrometheusBuilder::new().install_recorder()?;

    let client_config = match ClientConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid client configuration; aborting startup");
            std::process::exit(1);
        }
    };
    let config = match PlannerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid planner configuration; aborting startup");
            std::process::exit(1);
        }
    };

    let client: Arc<dyn SchoolApiClient> =
        Arc::new(ReqwestSchoolApiClient::from_config(&client_config));
    let state = Arc::new(routes::AppState {
        planner: PlannerService::from_config(client, &config),
        metrics: Some(handle),
    });

    let app = with_limits(routes::router(state), &config);

    let addr = config.address;
    info!(
        %addr,
        base_url = %client_config.base_url,
        timezone = %config.timezone,
        max_body_bytes = config.max_body_size,
        "starting HTTP server"
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service());
    if let Err(e) = server
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to install ctrl+c handler: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
