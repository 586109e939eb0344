//! Extraction orchestrator.
//!
//! ```text
//! Resolve -> StaticFetch -> StaticParse -> DynamicRender -> DynamicParse -> Merge -> Done
//! ```
//!
//! `Resolve` failing aborts before any network call. A failure in any other
//! stage only empties that tier; the run fails as a whole only when no tier
//! could reach a source at all, or when the overall budget runs out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use placecheck_core::{resolve_identity, AppConfig, ListingIdentity, PlaceRecord};

use crate::error::{ExtractError, ScraperError};
use crate::markup::{harvest_embedded, harvest_markup, name_from_title, regex_fallback, Tier};
use crate::provider::{DynamicSource, RenderRequest, RenderedPage, StaticSource};
use crate::scan::scan;
use crate::signal::{first_match, is_placeholder, ExtractedSignal, PartialRecord, Provenance};

/// Substrings that appear once listing data has hydrated.
const READY_MARKERS: &[&str] = &["roadAddress", "reviewCount", "keywordList"];

/// Controls that reveal collapsed description and directions text.
const EXPAND_LABELS: &[&str] = &["더보기", "펼쳐서 더보기", "정보"];

const NAME_SELECTORS: &[&str] = &["#_title .GHAhO", "#_title span:first-child", ".Fc1rA"];
const ADDRESS_SELECTORS: &[&str] = &[".LDgIH", ".PkgBl .LDgIH"];
const DESCRIPTION_SELECTORS: &[&str] = &[".zPfVt", ".T8RFa"];
const DIRECTIONS_SELECTORS: &[&str] = &[".nZapA", ".xPvPE"];

/// Shortest DOM text accepted for long-form fields; shorter text is usually
/// a button label or heading.
const MIN_DOM_LONG_TEXT_CHARS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolve,
    StaticFetch,
    StaticParse,
    DynamicRender,
    DynamicParse,
    Merge,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Stage::Resolve => "resolve",
            Stage::StaticFetch => "static_fetch",
            Stage::StaticParse => "static_parse",
            Stage::DynamicRender => "dynamic_render",
            Stage::DynamicParse => "dynamic_parse",
            Stage::Merge => "merge",
            Stage::Done => "done",
        };
        f.write_str(label)
    }
}

/// Result of one extraction tier.
#[derive(Debug)]
pub enum TierOutcome {
    /// The source was reached and yielded at least one field.
    Signals(PartialRecord),
    /// The source was reached but yielded nothing.
    Empty,
    /// The source could not be reached.
    Failed(ScraperError),
}

impl TierOutcome {
    fn from_partial(found: PartialRecord) -> Self {
        if found.is_empty() {
            TierOutcome::Empty
        } else {
            TierOutcome::Signals(found)
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, TierOutcome::Failed(_))
    }

    #[must_use]
    pub fn into_partial(self) -> PartialRecord {
        match self {
            TierOutcome::Signals(found) => found,
            TierOutcome::Empty | TierOutcome::Failed(_) => PartialRecord::default(),
        }
    }
}

/// Which tiers a run may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierPlan {
    StaticOnly,
    StaticAndDynamic,
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Overall budget for one run, covering every tier.
    pub request_timeout: Duration,
    pub ready_timeout: Duration,
}

impl ExtractOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            ready_timeout: Duration::from_secs(config.ready_timeout_secs),
        }
    }
}

/// Runs the extraction tiers for one listing and merges their output.
pub struct Extractor {
    static_source: Arc<dyn StaticSource>,
    dynamic_source: Option<Arc<dyn DynamicSource>>,
    options: ExtractOptions,
}

impl Extractor {
    #[must_use]
    pub fn new(
        static_source: Arc<dyn StaticSource>,
        dynamic_source: Option<Arc<dyn DynamicSource>>,
        options: ExtractOptions,
    ) -> Self {
        Self {
            static_source,
            dynamic_source,
            options,
        }
    }

    /// The static source, shared with the competitor search.
    #[must_use]
    pub fn static_source(&self) -> Arc<dyn StaticSource> {
        Arc::clone(&self.static_source)
    }

    /// Resolves `input` and runs every available tier.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Identity`] if `input` does not name a listing.
    /// - [`ExtractError::ProviderUnavailable`] if no tier reached its source.
    /// - [`ExtractError::TimedOut`] if the overall budget ran out.
    pub async fn extract(&self, input: &str) -> Result<PlaceRecord, ExtractError> {
        let identity = resolve_identity(input).inspect_err(|e| {
            tracing::debug!(stage = %Stage::Resolve, error = %e, "identity resolution failed");
        })?;
        self.extract_identity(&identity, TierPlan::StaticAndDynamic)
            .await
    }

    /// Runs the tiers in `plan` for an already-resolved listing.
    ///
    /// # Errors
    ///
    /// See [`Extractor::extract`]; identity errors cannot occur here.
    pub async fn extract_identity(
        &self,
        identity: &ListingIdentity,
        plan: TierPlan,
    ) -> Result<PlaceRecord, ExtractError> {
        let budget = self.options.request_timeout;
        if let Ok(result) = tokio::time::timeout(budget, self.run(identity, plan)).await {
            result
        } else {
            tracing::warn!(listing = %identity, secs = budget.as_secs(), "extraction timed out");
            Err(ExtractError::TimedOut {
                secs: budget.as_secs(),
            })
        }
    }

    async fn run(
        &self,
        identity: &ListingIdentity,
        plan: TierPlan,
    ) -> Result<PlaceRecord, ExtractError> {
        let url = identity.canonical_url();

        let static_outcome = self.static_tier(&url).await;
        let dynamic_outcome = match (&self.dynamic_source, plan) {
            (Some(source), TierPlan::StaticAndDynamic) => {
                Some(self.dynamic_tier(source.as_ref(), &url).await)
            }
            _ => None,
        };

        let all_failed = static_outcome.is_failed()
            && dynamic_outcome.as_ref().is_none_or(TierOutcome::is_failed);
        if all_failed {
            let reason = [Some(&static_outcome), dynamic_outcome.as_ref()]
                .into_iter()
                .flatten()
                .filter_map(|outcome| match outcome {
                    TierOutcome::Failed(e) => Some(e.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("; ");
            tracing::error!(listing = %identity, %reason, "every extraction tier failed");
            return Err(ExtractError::ProviderUnavailable { reason });
        }

        let merged = static_outcome
            .into_partial()
            .merge(dynamic_outcome.map(TierOutcome::into_partial).unwrap_or_default());
        tracing::debug!(
            stage = %Stage::Merge,
            listing = %identity,
            missing = ?merged.missing_fields(),
            "tiers merged"
        );

        let record = merged.into_record();
        tracing::info!(
            stage = %Stage::Done,
            listing = %identity,
            name = %record.name,
            review_count = record.review_count,
            photo_count = record.photo_count,
            "extraction complete"
        );
        Ok(record)
    }

    async fn static_tier(&self, url: &str) -> TierOutcome {
        tracing::debug!(stage = %Stage::StaticFetch, url, "fetching listing page");
        let markup = match self.static_source.fetch(url).await {
            Ok(markup) => markup,
            Err(e) => {
                tracing::warn!(stage = %Stage::StaticFetch, url, error = %e, "static tier failed");
                return TierOutcome::Failed(e);
            }
        };
        let found = harvest_markup(&markup, Tier::Static);
        tracing::debug!(
            stage = %Stage::StaticParse,
            bytes = markup.len(),
            missing = ?found.missing_fields(),
            "static tier parsed"
        );
        TierOutcome::from_partial(found)
    }

    async fn dynamic_tier(&self, source: &dyn DynamicSource, url: &str) -> TierOutcome {
        tracing::debug!(stage = %Stage::DynamicRender, url, "rendering listing page");
        let page = match source.render(&self.render_request(url)).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(stage = %Stage::DynamicRender, url, error = %e, "dynamic tier failed");
                return TierOutcome::Failed(e);
            }
        };
        let found = parse_rendered(&page);
        tracing::debug!(
            stage = %Stage::DynamicParse,
            bytes = page.final_markup.len(),
            intercepted = page.intercepted_json.len(),
            missing = ?found.missing_fields(),
            "dynamic tier parsed"
        );
        TierOutcome::from_partial(found)
    }

    fn render_request(&self, url: &str) -> RenderRequest {
        RenderRequest {
            url: url.to_owned(),
            ready_markers: to_owned_all(READY_MARKERS),
            ready_timeout: self.options.ready_timeout,
            selectors: [
                NAME_SELECTORS,
                ADDRESS_SELECTORS,
                DESCRIPTION_SELECTORS,
                DIRECTIONS_SELECTORS,
            ]
            .concat()
            .into_iter()
            .map(str::to_owned)
            .collect(),
            expand_labels: to_owned_all(EXPAND_LABELS),
        }
    }
}

/// Turns a rendered page into signals: embedded state first, then DOM text
/// and the page title, then counts and keywords from intercepted responses,
/// and regex fallbacks last.
#[must_use]
pub fn parse_rendered(page: &RenderedPage) -> PartialRecord {
    let title = PartialRecord {
        name: name_from_title(&page.title, Provenance::DynamicDom),
        ..PartialRecord::default()
    };

    let network = page
        .intercepted_json
        .iter()
        .map(|body| scan(body, Provenance::InterceptedNetworkJson))
        .fold(PartialRecord::default(), PartialRecord::absorb);
    let network = PartialRecord {
        keywords: network.keywords,
        review_count: network.review_count,
        photo_count: network.photo_count,
        ..PartialRecord::default()
    };

    harvest_embedded(&page.final_markup, Tier::Dynamic)
        .merge(dom_signals(&page.dom_text))
        .merge(title)
        .merge(network)
        .fill_missing(regex_fallback(&page.final_markup, Provenance::DynamicRegex))
}

fn dom_signals(dom_text: &BTreeMap<String, String>) -> PartialRecord {
    let pick = |selectors: &[&str], min_chars: usize| {
        first_match(selectors, |selector| {
            dom_text
                .get(*selector)
                .filter(|text| !is_placeholder(text))
                .filter(|text| text.trim().chars().count() >= min_chars)
                .and_then(|text| ExtractedSignal::text(text, Provenance::DynamicDom))
        })
    };
    PartialRecord {
        name: pick(NAME_SELECTORS, 1),
        address: pick(ADDRESS_SELECTORS, 5),
        description: pick(DESCRIPTION_SELECTORS, MIN_DOM_LONG_TEXT_CHARS),
        directions: pick(DIRECTIONS_SELECTORS, MIN_DOM_LONG_TEXT_CHARS),
        ..PartialRecord::default()
    }
}

fn to_owned_all(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}
