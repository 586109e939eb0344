//! Listing identity resolution.
//!
//! Every accepted listing URL shape maps to one numeric identifier, and the
//! identifier alone determines which page the extraction pipeline fetches.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SUPPORTED_HOSTS: &[&str] = &[
    "m.place.naver.com",
    "place.naver.com",
    "map.naver.com",
    "naver.me",
];

/// Identifier patterns in priority order; the first capture wins.
static ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/entry/place/(\d+)",
        r"place\.naver\.com/[^/?#]+/(\d+)",
        r"m\.place\.naver\.com/(?:place|[^/?#]+)/(\d+)",
        r"[?&]place=(\d+)",
        r"(\d{7,})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static LONG_DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{7,}").expect("valid regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("\"{input}\" is not a valid URL: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("unsupported listing host \"{host}\"")]
    UnsupportedHost { host: String },

    #[error("no listing identifier found in \"{input}\"")]
    NoIdentifier { input: String },
}

/// The resolved identity of one listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingIdentity {
    id: String,
}

impl ListingIdentity {
    /// Wraps an already-known identifier. Returns `None` unless `id` is all
    /// ASCII digits.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then(|| Self {
            id: id.to_owned(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The mobile listing page; both extraction tiers load this URL.
    #[must_use]
    pub fn canonical_url(&self) -> String {
        format!("https://m.place.naver.com/place/{}/home", self.id)
    }

    /// The desktop map entry page for the same listing.
    #[must_use]
    pub fn map_entry_url(&self) -> String {
        format!("https://map.naver.com/p/entry/place/{}", self.id)
    }
}

impl std::fmt::Display for ListingIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Returns `true` when `input` is an absolute URL on a supported listing host
/// that carries a 7+ digit identifier.
#[must_use]
pub fn is_supported_url(input: &str) -> bool {
    url::Url::parse(input.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .is_some_and(|host| SUPPORTED_HOSTS.contains(&host.as_str()))
        && LONG_DIGIT_RUN.is_match(input)
}

/// Resolves a listing URL to its identity.
///
/// # Errors
///
/// - [`IdentityError::InvalidUrl`] if `input` is not an absolute URL.
/// - [`IdentityError::UnsupportedHost`] if the host is not a listing host.
/// - [`IdentityError::NoIdentifier`] if no identifier pattern matches.
pub fn resolve_identity(input: &str) -> Result<ListingIdentity, IdentityError> {
    let trimmed = input.trim();
    let parsed = url::Url::parse(trimmed).map_err(|e| IdentityError::InvalidUrl {
        input: trimmed.to_owned(),
        reason: e.to_string(),
    })?;

    let host = parsed.host_str().unwrap_or_default();
    if !SUPPORTED_HOSTS.contains(&host) {
        return Err(IdentityError::UnsupportedHost {
            host: host.to_owned(),
        });
    }

    ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(trimmed)?.get(1))
        .and_then(|m| ListingIdentity::from_id(m.as_str()))
        .ok_or_else(|| IdentityError::NoIdentifier {
            input: trimmed.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_url_shapes_resolve_to_same_canonical_url() {
        let inputs = [
            "https://map.naver.com/p/entry/place/1234567",
            "https://place.naver.com/restaurant/1234567",
            "https://m.place.naver.com/place/1234567/home",
            "https://map.naver.com/?place=1234567",
        ];
        let urls: Vec<String> = inputs
            .iter()
            .map(|u| resolve_identity(u).expect("resolvable").canonical_url())
            .collect();
        assert!(urls.iter().all(|u| u == "https://m.place.naver.com/place/1234567/home"));
    }

    #[test]
    fn category_path_and_query_string_are_ignored() {
        let id = resolve_identity("https://m.place.naver.com/hairshop/1443688242/review?entry=pll")
            .expect("resolvable");
        assert_eq!(id.id(), "1443688242");
    }

    #[test]
    fn entry_pattern_beats_digit_fallback() {
        let id = resolve_identity(
            "https://map.naver.com/p/search/9999999/entry/place/1057854280?c=15.00",
        )
        .expect("resolvable");
        assert_eq!(id.id(), "1057854280");
    }

    #[test]
    fn bare_long_digit_run_is_last_resort() {
        let id = resolve_identity("https://naver.me/share?ref=12345678").expect("resolvable");
        assert_eq!(id.id(), "12345678");
    }

    #[test]
    fn unparsable_input_is_invalid_url() {
        let err = resolve_identity("not a url").unwrap_err();
        assert!(matches!(err, IdentityError::InvalidUrl { .. }));
    }

    #[test]
    fn foreign_host_is_rejected() {
        let err = resolve_identity("https://example.com/place/1234567").unwrap_err();
        assert_eq!(
            err,
            IdentityError::UnsupportedHost {
                host: "example.com".to_string()
            }
        );
    }

    #[test]
    fn missing_identifier_is_an_error_not_a_default() {
        let err = resolve_identity("https://map.naver.com/p/search/coffee").unwrap_err();
        assert!(matches!(err, IdentityError::NoIdentifier { .. }));
    }

    #[test]
    fn supported_url_requires_host_and_long_id() {
        assert!(is_supported_url("https://m.place.naver.com/place/1234567"));
        assert!(!is_supported_url("https://m.place.naver.com/place/123"));
        assert!(!is_supported_url("https://example.com/place/1234567"));
        assert!(!is_supported_url("1234567"));
    }

    #[test]
    fn from_id_rejects_non_digits() {
        assert!(ListingIdentity::from_id("12a45").is_none());
        assert!(ListingIdentity::from_id("").is_none());
        assert_eq!(
            ListingIdentity::from_id(" 1234567 ").map(|i| i.map_entry_url()),
            Some("https://map.naver.com/p/entry/place/1234567".to_string())
        );
    }
}
