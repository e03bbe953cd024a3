pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
pub mod export;
pub mod filter;
pub mod metrics_defs;
pub mod oauth;
pub mod page_fetcher;
pub mod service;
pub mod sessions;
pub mod types;

#[cfg(test)]
mod testutils;

use aggregator::{ActivitySource, ParallelAggregator};
use api::AppState;
use axum::Router;
use config::{Config, Listener};
use errors::RunError;
use filter::ActivityFilter;
use oauth::OAuthClient;
use page_fetcher::PageFetcher;
use service::ActivityService;
use shared::admin_service::{AdminService, ServiceStatus};
use shared::http::run_http_service;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;

/// Serves the activities API and the admin endpoints until interrupted.
pub async fn run(config: Config) -> Result<(), RunError> {
    config.validate()?;

    let service = Arc::new(ActivityService::new(
        activity_source(&config)?,
        ActivityFilter::new(&config.filter.keyword),
        config.cache.freshness(),
    ));
    let oauth = Arc::new(OAuthClient::new(&config.strava)?);
    let status = Arc::new(Status::new(service.clone()));

    let app = api::router(AppState { service, oauth }, config.static_dir.as_deref());

    let api_task = serve_api(&config.listener, app, status.clone());
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<RunError>::new(status),
        shutdown_signal(),
    );

    tokio::try_join!(api_task, admin_task)?;
    tracing::info!("shut down cleanly");
    Ok(())
}

/// Fetches and filters one athlete's activities with a refresh token and
/// writes them to `output`. Returns the number of activities written.
pub async fn run_export(
    config: Config,
    refresh_token: &str,
    output: &Path,
) -> Result<usize, RunError> {
    config.validate()?;

    let source = activity_source(&config)?;
    let oauth = OAuthClient::new(&config.strava)?;
    let filter = ActivityFilter::new(&config.filter.keyword);

    let activities =
        export::fetch_filtered(&oauth, source.as_ref(), &filter, refresh_token).await?;
    export::write_json(output, &activities)?;
    Ok(activities.len())
}

fn activity_source(config: &Config) -> Result<Arc<dyn ActivitySource>, RunError> {
    let pages = PageFetcher::new(config.strava.activities_url()?, &config.fetch);
    Ok(Arc::new(ParallelAggregator::new(Arc::new(pages), &config.fetch)))
}

async fn serve_api(listener: &Listener, app: Router, status: Arc<Status>) -> Result<(), RunError> {
    let tcp = TcpListener::bind(format!("{}:{}", listener.host, listener.port)).await?;
    tracing::info!(host = %listener.host, port = listener.port, "serving activities API");
    status.ready.store(true, Ordering::Relaxed);

    axum::serve(tcp, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    status.ready.store(false, Ordering::Relaxed);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not install shutdown handler");
        // Without a handler the process runs until killed
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Readiness and counters reported on the admin listener.
struct Status {
    ready: AtomicBool,
    service: Arc<ActivityService>,
}

impl Status {
    fn new(service: Arc<ActivityService>) -> Self {
        Status {
            ready: AtomicBool::new(false),
            service,
        }
    }
}

impl ServiceStatus for Status {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "cached_users": self.service.cache().len(),
            "sessions": self.service.sessions().len(),
        })
    }
}
