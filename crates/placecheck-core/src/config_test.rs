use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "PLACECHECK_ENV"));
}

#[test]
fn build_app_config_empty_env_uses_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should load");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.request_timeout_secs, 90);
    assert!(cfg.browser_enabled);
    assert!(cfg.browser_executable.is_none());
    assert_eq!(cfg.browser_max_pages, 4);
    assert_eq!(cfg.competitor_limit, 5);
    assert_eq!(cfg.competitor_concurrency, 3);
}

#[test]
fn port_overrides_bind_addr_port() {
    let mut map = HashMap::new();
    map.insert("PLACECHECK_BIND_ADDR", "127.0.0.1:8080");
    map.insert("PORT", "4321");
    let cfg = build_app_config(lookup_from_map(&map)).expect("valid config");
    assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:4321");
}

#[test]
fn invalid_port_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PORT", "not-a-port");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PORT"),
        "expected InvalidEnvVar(PORT), got: {result:?}"
    );
}

#[test]
fn invalid_bind_addr_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PLACECHECK_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PLACECHECK_BIND_ADDR"),
        "expected InvalidEnvVar(PLACECHECK_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn browser_flag_accepts_common_spellings() {
    for (raw, expected) in [("0", false), ("off", false), ("TRUE", true), ("yes", true)] {
        let mut map = HashMap::new();
        map.insert("PLACECHECK_BROWSER_ENABLED", raw);
        let cfg = build_app_config(lookup_from_map(&map)).expect("valid config");
        assert_eq!(cfg.browser_enabled, expected, "raw value {raw}");
    }
}

#[test]
fn browser_flag_rejects_garbage() {
    let mut map = HashMap::new();
    map.insert("PLACECHECK_BROWSER_ENABLED", "maybe");
    assert!(build_app_config(lookup_from_map(&map)).is_err());
}

#[test]
fn zero_browser_pages_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PLACECHECK_BROWSER_MAX_PAGES", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PLACECHECK_BROWSER_MAX_PAGES"),
        "got: {result:?}"
    );
}

#[test]
fn zero_timeouts_and_rate_limit_are_rejected() {
    for var in [
        "PLACECHECK_REQUEST_TIMEOUT_SECS",
        "PLACECHECK_FETCH_TIMEOUT_SECS",
        "PLACECHECK_NAVIGATION_TIMEOUT_SECS",
        "PLACECHECK_READY_TIMEOUT_SECS",
        "PLACECHECK_RATE_LIMIT_PER_MINUTE",
    ] {
        let mut map = HashMap::new();
        map.insert(var, "0");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { var: ref got, .. }) if got == var),
            "{var} = 0 should be rejected, got: {result:?}"
        );
    }
}

#[test]
fn zero_settle_delay_and_retries_are_allowed() {
    let mut map = HashMap::new();
    map.insert("PLACECHECK_SETTLE_DELAY_MS", "0");
    map.insert("PLACECHECK_FETCH_MAX_RETRIES", "0");
    let cfg = build_app_config(lookup_from_map(&map)).expect("valid config");
    assert_eq!(cfg.settle_delay_ms, 0);
    assert_eq!(cfg.fetch_max_retries, 0);
}

#[test]
fn chrome_executable_is_used_when_specific_var_missing() {
    let mut map = HashMap::new();
    map.insert("CHROME_EXECUTABLE", "/usr/bin/chromium");
    let cfg = build_app_config(lookup_from_map(&map)).expect("valid config");
    assert_eq!(
        cfg.browser_executable.as_deref(),
        Some(std::path::Path::new("/usr/bin/chromium"))
    );
}

#[test]
fn zero_competitor_concurrency_is_clamped_to_one() {
    let mut map = HashMap::new();
    map.insert("PLACECHECK_COMPETITOR_CONCURRENCY", "0");
    let cfg = build_app_config(lookup_from_map(&map)).expect("valid config");
    assert_eq!(cfg.competitor_concurrency, 1);
}
