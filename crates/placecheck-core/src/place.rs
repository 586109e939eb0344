//! Listing records shared by the extraction pipeline and the diagnosis engine.

use serde::{Deserialize, Serialize};

/// Upper bound on representative keywords a listing may carry.
pub const MAX_KEYWORDS: usize = 5;

/// The merged result of one extraction run.
///
/// Text fields are trimmed and may be empty; counts default to 0 when the
/// source exposed nothing. `keywords` holds at most [`MAX_KEYWORDS`] distinct
/// entries in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    pub name: String,
    pub address: String,
    pub description: String,
    pub directions: String,
    pub keywords: Vec<String>,
    pub review_count: u64,
    pub photo_count: u64,
}

/// Abbreviated record returned for each competitor listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorRecord {
    pub name: String,
    pub address: String,
    pub keywords: Vec<String>,
    pub review_count: u64,
    pub photo_count: u64,
}

impl From<PlaceRecord> for CompetitorRecord {
    fn from(record: PlaceRecord) -> Self {
        Self {
            name: record.name,
            address: record.address,
            keywords: record.keywords,
            review_count: record.review_count,
            photo_count: record.photo_count,
        }
    }
}

/// Caller access level. Diagnostic output is always returned; prescriptive
/// output is redacted unless the plan is `Pro`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    #[serde(alias = "paid")]
    Pro,
}

impl Plan {
    #[must_use]
    pub fn is_paid(self) -> bool {
        matches!(self, Plan::Pro)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Pro => write!(f, "pro"),
        }
    }
}

impl std::str::FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "pro" | "paid" => Ok(Plan::Pro),
            other => Err(format!("unknown plan \"{other}\" (expected free or pro)")),
        }
    }
}
