mod api;
mod middleware;
mod service;

use std::sync::Arc;

use placecheck_scraper::{
    BrowserSession, BrowserSettings, CompetitorAggregator, DynamicSource, ExtractOptions,
    Extractor, HttpFetcher,
};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::RateLimitState,
    service::LivePlaceSource,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = placecheck_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let fetcher = Arc::new(HttpFetcher::new(
        config.fetch_timeout_secs,
        &config.mobile_user_agent,
        config.fetch_max_retries,
        config.retry_backoff_base_ms,
    )?);

    let session = if config.browser_enabled {
        let session = BrowserSession::new(BrowserSettings::from_config(&config));
        if let Err(e) = session.launch().await {
            tracing::warn!(error = %e, "browser did not start; will retry on first render");
        }
        Some(session)
    } else {
        tracing::info!("browser tier disabled; serving static extraction only");
        None
    };

    let dynamic = session
        .clone()
        .map(|session| session as Arc<dyn DynamicSource>);
    let extractor = Arc::new(Extractor::new(
        fetcher,
        dynamic,
        ExtractOptions::from_config(&config),
    ));
    let aggregator = CompetitorAggregator::from_config(Arc::clone(&extractor), &config);
    let source = LivePlaceSource::new(extractor, aggregator, config.competitor_limit);

    let app = build_app(
        AppState {
            source: Arc::new(source),
        },
        RateLimitState::per_minute(config.rate_limit_per_minute),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "placecheck server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(session) = session {
        session.shutdown().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
