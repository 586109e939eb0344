use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Default client identity for both extraction tiers. The listing pages serve
/// their richest embedded state to mobile browsers.
pub const DEFAULT_MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";

pub const DEFAULT_SEARCH_URL: &str = "https://m.search.naver.com/search.naver?where=m_local&query=";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Overall budget for one extraction run, all tiers included.
    pub request_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub mobile_user_agent: String,
    pub fetch_max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub browser_enabled: bool,
    /// Explicit Chromium binary; `None` means auto-discover.
    pub browser_executable: Option<PathBuf>,
    /// Upper bound on render contexts open at the same time.
    pub browser_max_pages: usize,
    pub navigation_timeout_secs: u64,
    pub ready_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub competitor_limit: usize,
    pub competitor_concurrency: usize,
    pub search_url: String,
    pub rate_limit_per_minute: usize,
}

impl AppConfig {
    /// Configuration with every optional variable at its default.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            env: Environment::Development,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            request_timeout_secs: 90,
            fetch_timeout_secs: 20,
            mobile_user_agent: DEFAULT_MOBILE_USER_AGENT.to_string(),
            fetch_max_retries: 2,
            retry_backoff_base_ms: 300,
            browser_enabled: true,
            browser_executable: None,
            browser_max_pages: 4,
            navigation_timeout_secs: 60,
            ready_timeout_secs: 20,
            settle_delay_ms: 1500,
            competitor_limit: 5,
            competitor_concurrency: 3,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            rate_limit_per_minute: 30,
        }
    }
}
