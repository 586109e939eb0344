//! Page sources behind the extraction tiers.
//!
//! The pipeline only sees these traits, so tests can substitute fakes for
//! the network and the browser.

mod browser;
mod http;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;

pub use browser::{BrowserSession, BrowserSettings};
pub use http::HttpFetcher;

/// Plain HTTP retrieval of a page's markup.
#[async_trait]
pub trait StaticSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError`] on transport failure or a non-2xx status.
    async fn fetch(&self, url: &str) -> Result<String, ScraperError>;
}

/// Full script-executing render of a page.
#[async_trait]
pub trait DynamicSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError::BrowserUnavailable`] when no browser can be
    /// started, or another [`ScraperError`] when this render failed.
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, ScraperError>;
}

/// What to load and what to read back from it.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub url: String,
    /// Substrings whose presence in the markup means the data has hydrated.
    pub ready_markers: Vec<String>,
    /// How long to poll for `ready_markers` before reading the page anyway.
    pub ready_timeout: Duration,
    /// CSS selectors whose visible text should be returned.
    pub selectors: Vec<String>,
    /// Labels of collapsed sections to click open before reading.
    pub expand_labels: Vec<String>,
}

/// The state of a rendered page once it has settled.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub final_markup: String,
    pub title: String,
    /// Visible text per selector; selectors that matched nothing are absent.
    pub dom_text: BTreeMap<String, String>,
    /// JSON bodies of responses the page itself requested while loading.
    pub intercepted_json: Vec<serde_json::Value>,
}
