//! The listing source behind the HTTP handlers.

use std::sync::Arc;

use async_trait::async_trait;
use placecheck_core::{CompetitorRecord, PlaceRecord};
use placecheck_scraper::{CompetitorAggregator, CompetitorError, ExtractError, Extractor};

#[async_trait]
pub trait PlaceSource: Send + Sync {
    async fn extract(&self, place_url: &str) -> Result<PlaceRecord, ExtractError>;

    async fn competitors(&self, term: &str) -> Result<Vec<CompetitorRecord>, CompetitorError>;
}

/// Extraction pipeline plus competitor search against the live site.
pub struct LivePlaceSource {
    extractor: Arc<Extractor>,
    aggregator: CompetitorAggregator,
    competitor_limit: usize,
}

impl LivePlaceSource {
    #[must_use]
    pub fn new(
        extractor: Arc<Extractor>,
        aggregator: CompetitorAggregator,
        competitor_limit: usize,
    ) -> Self {
        Self {
            extractor,
            aggregator,
            competitor_limit,
        }
    }
}

#[async_trait]
impl PlaceSource for LivePlaceSource {
    async fn extract(&self, place_url: &str) -> Result<PlaceRecord, ExtractError> {
        self.extractor.extract(place_url).await
    }

    async fn competitors(&self, term: &str) -> Result<Vec<CompetitorRecord>, CompetitorError> {
        self.aggregator.search(term, self.competitor_limit).await
    }
}
