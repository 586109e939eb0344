//! Headless Chromium rendering via `chromiumoxide`.
//!
//! One browser process is launched per [`BrowserSession`] and shared by all
//! requests. Each render gets a fresh browser context (its own cookies, cache
//! and storage) holding a single tab with its own capture buffer, and at most
//! `max_pages` renders run at once. The context is disposed on every exit
//! path, including cancellation, through [`PageGuard`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use placecheck_core::AppConfig;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use super::{DynamicSource, RenderRequest, RenderedPage};
use crate::error::ScraperError;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Installed before any page script runs. Copies JSON response bodies from
/// `fetch` and `XMLHttpRequest` into a per-document buffer.
const CAPTURE_SCRIPT: &str = r"(() => {
  if (window.__placecheckCaptured) return;
  const captured = [];
  Object.defineProperty(window, '__placecheckCaptured', { value: captured, enumerable: false });
  const keep = (text) => {
    if (typeof text !== 'string' || captured.length >= 64 || text.length > 2000000) return;
    const head = text.trimStart().charAt(0);
    if (head === '{' || head === '[') captured.push(text);
  };
  const originalFetch = window.fetch;
  if (originalFetch) {
    window.fetch = function (...args) {
      return originalFetch.apply(this, args).then((response) => {
        try { response.clone().text().then(keep).catch(() => {}); } catch (_) {}
        return response;
      });
    };
  }
  const originalSend = XMLHttpRequest.prototype.send;
  XMLHttpRequest.prototype.send = function (...args) {
    this.addEventListener('load', () => {
      try {
        if (this.responseType === '' || this.responseType === 'text') keep(this.responseText);
      } catch (_) {}
    });
    return originalSend.apply(this, args);
  };
})()";

const READ_CAPTURED: &str = "(window.__placecheckCaptured || []).slice()";

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Explicit executable; discovered on `PATH` and well-known locations when absent.
    pub executable: Option<PathBuf>,
    pub user_agent: String,
    pub max_pages: usize,
    pub navigation_timeout: Duration,
    /// Pause after readiness and after expanding sections, for late hydration.
    pub settle_delay: Duration,
}

impl BrowserSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            executable: config.browser_executable.clone(),
            user_agent: config.mobile_user_agent.clone(),
            max_pages: config.browser_max_pages.max(1),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }
}

struct Running {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// A long-lived browser process shared by every dynamic render.
///
/// The browser starts on [`BrowserSession::launch`] (or lazily on the first
/// render) and restarts transparently if it has died.
pub struct BrowserSession {
    settings: BrowserSettings,
    running: Arc<Mutex<Option<Running>>>,
    permits: Arc<Semaphore>,
}

impl BrowserSession {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Arc<Self> {
        let permits = Arc::new(Semaphore::new(settings.max_pages));
        Arc::new(Self {
            settings,
            running: Arc::new(Mutex::new(None)),
            permits,
        })
    }

    /// Starts the browser process now instead of on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::BrowserUnavailable`] if no executable is found
    /// or the process fails to start.
    pub async fn launch(&self) -> Result<(), ScraperError> {
        let mut running = self.running.lock().await;
        if running.is_none() {
            *running = Some(start_browser(&self.settings).await?);
        }
        Ok(())
    }

    /// Closes the browser. Renders started afterwards fail with
    /// [`ScraperError::BrowserUnavailable`].
    pub async fn shutdown(&self) {
        self.permits.close();
        if let Some(mut running) = self.running.lock().await.take() {
            if let Err(e) = running.browser.close().await {
                tracing::warn!(error = %e, "browser did not close cleanly");
            }
            running.handler.abort();
            tracing::info!("browser session shut down");
        }
    }

    async fn open_page(&self) -> Result<(Page, BrowserContextId), ScraperError> {
        let mut running = self.running.lock().await;
        if running.is_none() {
            *running = Some(start_browser(&self.settings).await?);
        }
        if let Some(current) = running.as_ref() {
            match open_isolated(&current.browser).await {
                Ok(opened) => return Ok(opened),
                Err(e) => tracing::warn!(error = %e, "browser unresponsive, restarting"),
            }
        }

        if let Some(mut dead) = running.take() {
            let _ = dead.browser.close().await;
            dead.handler.abort();
        }
        let fresh = running.insert(start_browser(&self.settings).await?);
        open_isolated(&fresh.browser).await
    }

    async fn drive(&self, page: &Page, request: &RenderRequest) -> Result<RenderedPage, ScraperError> {
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(CAPTURE_SCRIPT))
            .await
            .map_err(|e| ScraperError::Browser(format!("failed to install capture script: {e}")))?;

        let nav = self.settings.navigation_timeout;
        tokio::time::timeout(nav, page.goto(request.url.as_str()))
            .await
            .map_err(|_| ScraperError::Timeout {
                stage: "navigation",
                secs: nav.as_secs(),
            })?
            .map_err(|e| ScraperError::Browser(format!("navigation failed: {e}")))?;

        let ready = wait_for_markers(page, &request.ready_markers, request.ready_timeout).await;
        if !ready {
            tracing::debug!(url = %request.url, "ready markers not seen, reading page as-is");
        }
        tokio::time::sleep(self.settings.settle_delay).await;

        if !request.expand_labels.is_empty() {
            let clicked: u64 = evaluate(page, &expand_script(&request.expand_labels)?)
                .await
                .unwrap_or(0);
            if clicked > 0 {
                tracing::debug!(clicked, "expanded collapsed sections");
                tokio::time::sleep(self.settings.settle_delay).await;
            }
        }

        let final_markup = page
            .content()
            .await
            .map_err(|e| ScraperError::Browser(format!("failed to read markup: {e}")))?;
        let title: String = evaluate(page, "document.title").await.unwrap_or_default();
        let dom_text: BTreeMap<String, String> =
            match evaluate(page, &selector_text_script(&request.selectors)?).await {
                Ok(map) => map,
                Err(e) => {
                    tracing::debug!(error = %e, "selector text unavailable");
                    BTreeMap::new()
                }
            };
        let bodies: Vec<String> = evaluate(page, READ_CAPTURED).await.unwrap_or_default();
        let intercepted_json = bodies
            .iter()
            .filter_map(|body| serde_json::from_str(body).ok())
            .collect();

        Ok(RenderedPage {
            final_markup,
            title,
            dom_text,
            intercepted_json,
        })
    }
}

#[async_trait]
impl DynamicSource for BrowserSession {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, ScraperError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ScraperError::BrowserUnavailable("browser session is shut down".to_owned()))?;
        let (page, context) = self.open_page().await?;
        let guard = PageGuard {
            page: Some(page.clone()),
            context: Some(context),
            running: Arc::clone(&self.running),
            _permit: permit,
        };
        let started = Instant::now();
        let result = self.drive(&page, request).await;
        guard.close().await;
        tracing::debug!(
            url = %request.url,
            elapsed_ms = started.elapsed().as_millis(),
            ok = result.is_ok(),
            "render finished"
        );
        result
    }
}

/// Owns one tab, its browser context and one concurrency permit. Dropping
/// the guard without calling [`PageGuard::close`] releases both on a
/// background task.
struct PageGuard {
    page: Option<Page>,
    context: Option<BrowserContextId>,
    running: Arc<Mutex<Option<Running>>>,
    _permit: OwnedSemaphorePermit,
}

impl PageGuard {
    async fn close(mut self) {
        release(self.page.take(), self.context.take(), &self.running).await;
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        let (page, context) = (self.page.take(), self.context.take());
        if page.is_none() && context.is_none() {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let running = Arc::clone(&self.running);
            handle.spawn(async move {
                release(page, context, &running).await;
            });
        }
    }
}

/// Target parameters for a blank tab inside `context`.
fn isolated_target(context: BrowserContextId) -> Result<CreateTargetParams, ScraperError> {
    CreateTargetParams::builder()
        .url("about:blank")
        .browser_context_id(context)
        .build()
        .map_err(|e| ScraperError::Browser(format!("invalid target parameters: {e}")))
}

/// Creates a fresh browser context and opens one blank tab inside it. The
/// context is disposed again if the tab cannot be opened.
async fn open_isolated(browser: &Browser) -> Result<(Page, BrowserContextId), ScraperError> {
    let context = browser
        .execute(CreateBrowserContextParams::default())
        .await
        .map_err(|e| ScraperError::Browser(format!("failed to create browser context: {e}")))?
        .result
        .browser_context_id;
    let opened = match isolated_target(context.clone()) {
        Ok(target) => browser
            .new_page(target)
            .await
            .map_err(|e| ScraperError::Browser(format!("failed to open tab: {e}"))),
        Err(e) => Err(e),
    };
    match opened {
        Ok(page) => Ok((page, context)),
        Err(e) => {
            let _ = browser
                .execute(DisposeBrowserContextParams::new(context))
                .await;
            Err(e)
        }
    }
}

/// Closes `page`, then disposes `context` if the browser that owns it is
/// still running.
async fn release(
    page: Option<Page>,
    context: Option<BrowserContextId>,
    running: &Mutex<Option<Running>>,
) {
    if let Some(page) = page {
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "tab close failed");
        }
    }
    let Some(context) = context else {
        return;
    };
    if let Some(current) = running.lock().await.as_ref() {
        if let Err(e) = current
            .browser
            .execute(DisposeBrowserContextParams::new(context))
            .await
        {
            tracing::debug!(error = %e, "browser context dispose failed");
        }
    }
}

async fn start_browser(settings: &BrowserSettings) -> Result<Running, ScraperError> {
    let exe = find_browser_executable(settings.executable.as_deref()).ok_or_else(|| {
        ScraperError::BrowserUnavailable("no Chromium-family executable found".to_owned())
    })?;
    let config = BrowserConfig::builder()
        .chrome_executable(&exe)
        .viewport(Viewport {
            width: 390,
            height: 844,
            device_scale_factor: Some(3.0),
            emulating_mobile: true,
            is_landscape: false,
            has_touch: true,
        })
        .window_size(390, 844)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--mute-audio")
        .arg("--lang=ko-KR")
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", settings.user_agent))
        .build()
        .map_err(|e| ScraperError::BrowserUnavailable(format!("invalid browser config: {e}")))?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        ScraperError::BrowserUnavailable(format!("failed to launch {}: {e}", exe.display()))
    })?;
    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::debug!(error = %e, "CDP handler error");
            }
        }
    });
    tracing::info!(executable = %exe.display(), "browser launched");
    Ok(Running { browser, handler })
}

/// Resolution order: explicit path, then `PATH`, then well-known install paths.
fn find_browser_executable(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    const NAMES: &[&str] = &[
        "chromium",
        "chromium-browser",
        "google-chrome",
        "google-chrome-stable",
        "chrome",
    ];
    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            if let Some(found) = NAMES.iter().map(|n| dir.join(n)).find(|p| p.exists()) {
                return Some(found);
            }
        }
    }

    const WELL_KNOWN: &[&str] = &[
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/bin/google-chrome",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    WELL_KNOWN.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Polls until any marker appears in the document or `timeout` elapses.
async fn wait_for_markers(page: &Page, markers: &[String], timeout: Duration) -> bool {
    if markers.is_empty() {
        return true;
    }
    let Ok(encoded) = serde_json::to_string(markers) else {
        return false;
    };
    let ready_check = format!(
        "((markers) => {{ const html = document.documentElement ? document.documentElement.outerHTML : ''; \
         return markers.some((m) => html.includes(m)); }})({encoded})"
    );
    let deadline = Instant::now() + timeout;
    loop {
        if evaluate::<bool>(page, &ready_check).await.unwrap_or(false) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}

fn expand_script(labels: &[String]) -> Result<String, ScraperError> {
    let encoded = encode_arg(labels)?;
    Ok(format!(
        "((labels) => {{ let clicked = 0; \
         for (const el of document.querySelectorAll('a, button, [role=\"button\"], [role=\"tab\"]')) {{ \
           const text = (el.innerText || '').trim(); \
           if (labels.includes(text)) {{ try {{ el.click(); clicked += 1; }} catch (_) {{}} }} \
         }} return clicked; }})({encoded})"
    ))
}

fn selector_text_script(selectors: &[String]) -> Result<String, ScraperError> {
    let encoded = encode_arg(selectors)?;
    Ok(format!(
        "((selectors) => {{ const out = {{}}; \
         for (const sel of selectors) {{ try {{ \
           const el = document.querySelector(sel); \
           const text = el ? (el.innerText || el.textContent || '').trim() : ''; \
           if (text) out[sel] = text; \
         }} catch (_) {{}} }} return out; }})({encoded})"
    ))
}

fn encode_arg(values: &[String]) -> Result<String, ScraperError> {
    serde_json::to_string(values)
        .map_err(|e| ScraperError::Browser(format!("failed to encode script argument: {e}")))
}

async fn evaluate<T: DeserializeOwned>(page: &Page, script: &str) -> Result<T, ScraperError> {
    page.evaluate(script.to_owned())
        .await
        .map_err(|e| ScraperError::Browser(format!("evaluate failed: {e}")))?
        .into_value::<T>()
        .map_err(|e| ScraperError::Browser(format!("unexpected evaluate result: {e}")))
}
