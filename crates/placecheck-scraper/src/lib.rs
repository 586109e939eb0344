//! Listing extraction for placecheck.
//!
//! Pages are harvested in tiers (static HTTP, then a headless browser), each
//! tier producing provenance-tagged signals that are merged into one
//! [`placecheck_core::PlaceRecord`].

pub mod competitors;
pub mod error;
pub mod markup;
pub mod pipeline;
pub mod provider;
pub(crate) mod retry;
pub mod scan;
pub mod signal;
pub mod slice;

pub use competitors::{collect_listing_ids, CompetitorAggregator};
pub use error::{CompetitorError, ExtractError, ScraperError};
pub use pipeline::{parse_rendered, ExtractOptions, Extractor, Stage, TierOutcome, TierPlan};
pub use provider::{
    BrowserSession, BrowserSettings, DynamicSource, HttpFetcher, RenderRequest, RenderedPage,
    StaticSource,
};
pub use scan::{parse_count, scan};
pub use signal::{ExtractedSignal, PartialRecord, Provenance};
pub use slice::slice_balanced;
