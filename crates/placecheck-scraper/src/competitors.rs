//! Competitor aggregation: search, collect listing links, extract each.

use std::sync::{Arc, LazyLock};

use futures::stream::{self, StreamExt};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use placecheck_core::{AppConfig, CompetitorRecord, ListingIdentity};
use regex::Regex;

use crate::error::CompetitorError;
use crate::pipeline::{Extractor, TierPlan};

/// Shapes in which a search result page links to a listing.
static LISTING_LINKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"place\.naver\.com/[a-z]+/(\d{7,})",
        r"/entry/place/(\d{7,})",
        r#"\\?"(?:placeId|id)\\?"\s*:\s*\\?"(\d{7,})\\?""#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Runs static-tier extraction for the top listings of a search.
pub struct CompetitorAggregator {
    extractor: Arc<Extractor>,
    search_url: String,
    concurrency: usize,
}

impl CompetitorAggregator {
    #[must_use]
    pub fn new(extractor: Arc<Extractor>, search_url: impl Into<String>, concurrency: usize) -> Self {
        Self {
            extractor,
            search_url: search_url.into(),
            concurrency: concurrency.max(1),
        }
    }

    #[must_use]
    pub fn from_config(extractor: Arc<Extractor>, config: &AppConfig) -> Self {
        Self::new(extractor, config.search_url.clone(), config.competitor_concurrency)
    }

    /// Searches for `term` and returns up to `limit` competitor records in
    /// result order. Listings that fail to extract are skipped.
    ///
    /// # Errors
    ///
    /// - [`CompetitorError::EmptyTerm`] if `term` is blank.
    /// - [`CompetitorError::SearchUnavailable`] if the search page cannot be loaded.
    pub async fn search(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<CompetitorRecord>, CompetitorError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(CompetitorError::EmptyTerm);
        }

        let url = format!(
            "{}{}",
            self.search_url,
            utf8_percent_encode(term, NON_ALPHANUMERIC)
        );
        let markup = self
            .extractor
            .static_source()
            .fetch(&url)
            .await
            .map_err(CompetitorError::SearchUnavailable)?;

        let listings = collect_listing_ids(&markup, limit);
        tracing::debug!(term, found = listings.len(), "competitor listings collected");

        let records: Vec<CompetitorRecord> = stream::iter(listings)
            .map(|identity| {
                let extractor = Arc::clone(&self.extractor);
                async move {
                    let result = extractor
                        .extract_identity(&identity, TierPlan::StaticOnly)
                        .await;
                    (identity, result)
                }
            })
            .buffered(self.concurrency)
            .filter_map(|(identity, result)| async move {
                match result {
                    Ok(record) => Some(CompetitorRecord::from(record)),
                    Err(e) => {
                        tracing::warn!(listing = %identity, error = %e, "competitor skipped");
                        None
                    }
                }
            })
            .collect()
            .await;

        tracing::info!(term, count = records.len(), "competitor analysis complete");
        Ok(records)
    }
}

/// Distinct listing identifiers in order of first appearance, at most `limit`.
#[must_use]
pub fn collect_listing_ids(markup: &str, limit: usize) -> Vec<ListingIdentity> {
    let mut hits: Vec<(usize, &str)> = LISTING_LINKS
        .iter()
        .flat_map(|re| re.captures_iter(markup))
        .filter_map(|cap| cap.get(1))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    let mut ids: Vec<ListingIdentity> = Vec::with_capacity(limit);
    for (_, raw) in hits {
        if ids.len() == limit {
            break;
        }
        if let Some(identity) = ListingIdentity::from_id(raw) {
            if !ids.contains(&identity) {
                ids.push(identity);
            }
        }
    }
    ids
}
