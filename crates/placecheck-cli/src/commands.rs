use std::sync::Arc;

use anyhow::Context;
use placecheck_core::{resolve_identity, AppConfig, Plan};
use placecheck_scraper::{
    BrowserSession, BrowserSettings, CompetitorAggregator, DynamicSource, ExtractOptions,
    Extractor, HttpFetcher,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Resolved {
    id: String,
    canonical_url: String,
    map_entry_url: String,
}

/// Extractor plus the browser session it owns, if any.
struct Pipeline {
    extractor: Arc<Extractor>,
    session: Option<Arc<BrowserSession>>,
}

impl Pipeline {
    fn build(config: &AppConfig, static_only: bool) -> anyhow::Result<Self> {
        let fetcher = Arc::new(
            HttpFetcher::new(
                config.fetch_timeout_secs,
                &config.mobile_user_agent,
                config.fetch_max_retries,
                config.retry_backoff_base_ms,
            )
            .context("failed to build HTTP client")?,
        );
        let session = (config.browser_enabled && !static_only)
            .then(|| BrowserSession::new(BrowserSettings::from_config(config)));
        let dynamic = session
            .clone()
            .map(|session| session as Arc<dyn DynamicSource>);

        let extractor = Extractor::new(fetcher, dynamic, ExtractOptions::from_config(config));
        Ok(Self {
            extractor: Arc::new(extractor),
            session,
        })
    }

    async fn close(self) {
        if let Some(session) = self.session {
            session.shutdown().await;
        }
    }
}

pub(crate) fn resolve(url: &str) -> anyhow::Result<Value> {
    let identity = resolve_identity(url)?;
    Ok(serde_json::to_value(Resolved {
        id: identity.id().to_owned(),
        canonical_url: identity.canonical_url(),
        map_entry_url: identity.map_entry_url(),
    })?)
}

pub(crate) async fn extract(
    config: &AppConfig,
    url: &str,
    static_only: bool,
) -> anyhow::Result<Value> {
    let pipeline = Pipeline::build(config, static_only)?;
    let result = pipeline.extractor.extract(url).await;
    pipeline.close().await;
    Ok(serde_json::to_value(result?)?)
}

pub(crate) async fn diagnose(
    config: &AppConfig,
    url: &str,
    plan: Plan,
    search: Option<&str>,
    static_only: bool,
) -> anyhow::Result<Value> {
    let pipeline = Pipeline::build(config, static_only)?;
    let record = match pipeline.extractor.extract(url).await {
        Ok(record) => record,
        Err(e) => {
            pipeline.close().await;
            return Err(e.into());
        }
    };

    let mut report = placecheck_diagnosis::diagnose(record);
    if let Some(term) = search.filter(|t| plan.is_paid() && !t.trim().is_empty()) {
        let aggregator = CompetitorAggregator::from_config(Arc::clone(&pipeline.extractor), config);
        match aggregator.search(term, config.competitor_limit).await {
            Ok(competitors) => report = report.with_competitors(competitors),
            Err(e) => tracing::warn!(term, error = %e, "competitor analysis unavailable"),
        }
    } else if search.is_some() && !plan.is_paid() {
        tracing::info!("competitor search requires --plan pro; skipping");
    }
    pipeline.close().await;

    Ok(serde_json::to_value(placecheck_diagnosis::redact(report, plan))?)
}
