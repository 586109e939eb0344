use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable is optional; an absent variable keeps the value from
/// [`AppConfig::defaults`], a present-but-malformed one is an error.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = AppConfig::defaults();

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let raw = |var: &str, default: String| -> String {
        lookup(var).map_or(default, |v| v.trim().to_string())
    };

    let env = parse_environment(&or_default("PLACECHECK_ENV", "development"))?;

    let mut bind_addr: SocketAddr = parse_value(
        "PLACECHECK_BIND_ADDR",
        &raw("PLACECHECK_BIND_ADDR", defaults.bind_addr.to_string()),
    )?;
    if let Ok(port) = lookup("PORT") {
        bind_addr.set_port(parse_value::<u16>("PORT", port.trim())?);
    }

    let log_level = or_default("PLACECHECK_LOG_LEVEL", &defaults.log_level);

    let number = |var: &str, default: u64| -> Result<u64, ConfigError> {
        parse_value(var, &raw(var, default.to_string()))
    };
    let count = |var: &str, default: usize| -> Result<usize, ConfigError> {
        parse_value(var, &raw(var, default.to_string()))
    };

    let request_timeout_secs =
        number("PLACECHECK_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?;
    let fetch_timeout_secs = number("PLACECHECK_FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs)?;
    let mobile_user_agent =
        or_default("PLACECHECK_MOBILE_USER_AGENT", &defaults.mobile_user_agent);
    let fetch_max_retries: u32 = parse_value(
        "PLACECHECK_FETCH_MAX_RETRIES",
        &raw(
            "PLACECHECK_FETCH_MAX_RETRIES",
            defaults.fetch_max_retries.to_string(),
        ),
    )?;
    let retry_backoff_base_ms = number(
        "PLACECHECK_RETRY_BACKOFF_BASE_MS",
        defaults.retry_backoff_base_ms,
    )?;

    let browser_enabled = parse_bool(
        "PLACECHECK_BROWSER_ENABLED",
        &raw("PLACECHECK_BROWSER_ENABLED", "true".to_string()),
    )?;
    let browser_executable = lookup("PLACECHECK_BROWSER_EXECUTABLE")
        .or_else(|_| lookup("CHROME_EXECUTABLE"))
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let browser_max_pages = count("PLACECHECK_BROWSER_MAX_PAGES", defaults.browser_max_pages)?;
    let navigation_timeout_secs = number(
        "PLACECHECK_NAVIGATION_TIMEOUT_SECS",
        defaults.navigation_timeout_secs,
    )?;
    let ready_timeout_secs = number("PLACECHECK_READY_TIMEOUT_SECS", defaults.ready_timeout_secs)?;
    let settle_delay_ms = number("PLACECHECK_SETTLE_DELAY_MS", defaults.settle_delay_ms)?;

    let competitor_limit = count("PLACECHECK_COMPETITOR_LIMIT", defaults.competitor_limit)?;
    let competitor_concurrency = count(
        "PLACECHECK_COMPETITOR_CONCURRENCY",
        defaults.competitor_concurrency,
    )?;
    let search_url = or_default("PLACECHECK_SEARCH_URL", &defaults.search_url);
    let rate_limit_per_minute = count(
        "PLACECHECK_RATE_LIMIT_PER_MINUTE",
        defaults.rate_limit_per_minute,
    )?;

    let zero_values = [
        ("PLACECHECK_REQUEST_TIMEOUT_SECS", request_timeout_secs == 0),
        ("PLACECHECK_FETCH_TIMEOUT_SECS", fetch_timeout_secs == 0),
        ("PLACECHECK_NAVIGATION_TIMEOUT_SECS", navigation_timeout_secs == 0),
        ("PLACECHECK_READY_TIMEOUT_SECS", ready_timeout_secs == 0),
        ("PLACECHECK_BROWSER_MAX_PAGES", browser_max_pages == 0),
        ("PLACECHECK_RATE_LIMIT_PER_MINUTE", rate_limit_per_minute == 0),
    ];
    if let Some((var, _)) = zero_values.iter().find(|(_, is_zero)| *is_zero) {
        return Err(ConfigError::InvalidEnvVar {
            var: (*var).to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        request_timeout_secs,
        fetch_timeout_secs,
        mobile_user_agent,
        fetch_max_retries,
        retry_backoff_base_ms,
        browser_enabled,
        browser_executable,
        browser_max_pages,
        navigation_timeout_secs,
        ready_timeout_secs,
        settle_delay_ms,
        competitor_limit,
        competitor_concurrency: competitor_concurrency.max(1),
        search_url,
        rate_limit_per_minute,
    })
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PLACECHECK_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
