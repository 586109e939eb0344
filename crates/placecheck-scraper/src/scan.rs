//! Recursive scan of a parsed JSON document for listing fields.
//!
//! The scan is a pure function of its input: it walks every object and array
//! once and returns a fresh [`PartialRecord`]. Text fields take the first
//! qualifying candidate seen; counts take the largest value seen anywhere,
//! since the same counter often appears several times with stale copies.

use serde_json::{Map, Value};

use crate::signal::{ExtractedSignal, PartialRecord, Provenance};

pub(crate) const NAME_FIELDS: &[&str] = &["placeName", "bizName", "businessName"];
pub(crate) const ADDRESS_FIELDS: &[&str] = &["roadAddress", "jibunAddress", "address", "fullAddress"];
pub(crate) const DESCRIPTION_FIELDS: &[&str] =
    &["introduction", "description", "summary", "businessDescription"];
pub(crate) const DIRECTIONS_FIELDS: &[&str] =
    &["directions", "way", "wayDescription", "directionDescription"];
pub(crate) const REVIEW_COUNT_FIELDS: &[&str] = &[
    "reviewCount",
    "totalReviewCount",
    "visitorReviewCount",
    "blogReviewCount",
    "reviewsCount",
];
pub(crate) const PHOTO_COUNT_FIELDS: &[&str] =
    &["photoCount", "totalPhotoCount", "photosCount", "imageCount"];
const KEYWORD_LIST_FIELDS: &[&str] = &["keywordList", "representKeywordList"];
const KEYWORD_ITEM_FIELDS: &[&str] = &["text", "name", "keyword"];

/// Minimum character lengths that separate real content from labels.
const MIN_NAME_CHARS: usize = 1;
const MIN_ADDRESS_CHARS: usize = 5;
const MIN_LONG_TEXT_CHARS: usize = 15;

#[derive(Clone, Copy)]
enum TextField {
    Name,
    Address,
    Description,
    Directions,
}

/// Candidate tables for each text field, in the order they are tried.
const TEXT_TARGETS: &[(TextField, &[&str], usize)] = &[
    (TextField::Name, NAME_FIELDS, MIN_NAME_CHARS),
    (TextField::Address, ADDRESS_FIELDS, MIN_ADDRESS_CHARS),
    (TextField::Description, DESCRIPTION_FIELDS, MIN_LONG_TEXT_CHARS),
    (TextField::Directions, DIRECTIONS_FIELDS, MIN_LONG_TEXT_CHARS),
];

/// Scans `root` and tags every value found with `provenance`.
#[must_use]
pub fn scan(root: &Value, provenance: Provenance) -> PartialRecord {
    let mut scanner = Scanner {
        provenance,
        found: PartialRecord::default(),
    };
    scanner.visit(root);
    scanner.found
}

/// Parses a count that may be a JSON number or a formatted string such as
/// `"1,927"`. Anything unparsable is 0.
#[must_use]
pub fn parse_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map_or(0, truncate)
        }),
        Value::String(s) => parse_count_str(s),
        _ => 0,
    }
}

// Saturating cast; fractional counts are truncated.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn truncate(f: f64) -> u64 {
    f as u64
}

/// Keeps only the ASCII digits of `raw` and parses them; 0 on failure.
#[must_use]
pub fn parse_count_str(raw: &str) -> u64 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

struct Scanner {
    provenance: Provenance,
    found: PartialRecord,
}

impl Scanner {
    fn visit(&mut self, node: &Value) {
        match node {
            Value::Object(map) => {
                self.inspect(map);
                for child in map.values() {
                    self.visit(child);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            _ => {}
        }
    }

    fn inspect(&mut self, map: &Map<String, Value>) {
        let provenance = self.provenance;
        if self.found.keywords.is_none() {
            self.found.keywords = KEYWORD_LIST_FIELDS
                .iter()
                .filter_map(|field| map.get(*field)?.as_array())
                .find_map(|items| {
                    ExtractedSignal::keywords(items.iter().filter_map(keyword_text), provenance)
                });
        }

        let review = max_count(map, REVIEW_COUNT_FIELDS);
        bump(&mut self.found.review_count, review, provenance);
        let photo = max_count(map, PHOTO_COUNT_FIELDS);
        bump(&mut self.found.photo_count, photo, provenance);

        for &(field, candidates, min_chars) in TEXT_TARGETS {
            let slot = match field {
                TextField::Name => &mut self.found.name,
                TextField::Address => &mut self.found.address,
                TextField::Description => &mut self.found.description,
                TextField::Directions => &mut self.found.directions,
            };
            if slot.is_some() {
                continue;
            }
            *slot = candidates
                .iter()
                .filter_map(|c| map.get(*c)?.as_str())
                .filter(|s| s.trim().chars().count() >= min_chars)
                .find_map(|s| ExtractedSignal::text(s, provenance));
        }
    }
}

fn keyword_text(item: &Value) -> Option<&str> {
    match item {
        Value::String(s) => Some(s),
        Value::Object(obj) => KEYWORD_ITEM_FIELDS
            .iter()
            .find_map(|f| obj.get(*f)?.as_str()),
        _ => None,
    }
}

fn max_count(map: &Map<String, Value>, fields: &[&str]) -> u64 {
    fields
        .iter()
        .filter_map(|f| map.get(*f))
        .map(parse_count)
        .max()
        .unwrap_or(0)
}

fn bump(slot: &mut Option<ExtractedSignal<u64>>, candidate: u64, provenance: Provenance) {
    if slot.as_ref().map_or(0, |s| s.value) < candidate {
        *slot = ExtractedSignal::count(candidate, provenance);
    }
}
