//! Provenance-tagged field values and the rules for combining them.
//!
//! Every extraction strategy produces a [`PartialRecord`] delta. Deltas are
//! combined with one of three explicit operations:
//!
//! - [`PartialRecord::absorb`] within one strategy family (first text wins,
//!   larger count wins),
//! - [`PartialRecord::fill_missing`] for last-resort sources that may only
//!   fill gaps,
//! - [`PartialRecord::merge`] across tiers, where a later value replaces an
//!   earlier one only when it is better.

use placecheck_core::{PlaceRecord, MAX_KEYWORDS};

/// Where a value was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    StaticEmbeddedJson,
    StaticRegex,
    DynamicEmbeddedJson,
    DynamicDom,
    InterceptedNetworkJson,
    DynamicRegex,
}

impl Provenance {
    /// Trust rank used to break ties; higher is more trusted.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Provenance::DynamicDom => 6,
            Provenance::DynamicEmbeddedJson => 5,
            Provenance::StaticEmbeddedJson => 4,
            Provenance::InterceptedNetworkJson => 3,
            Provenance::DynamicRegex => 2,
            Provenance::StaticRegex => 1,
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Provenance::StaticEmbeddedJson => "static_embedded_json",
            Provenance::StaticRegex => "static_regex",
            Provenance::DynamicEmbeddedJson => "dynamic_embedded_json",
            Provenance::DynamicDom => "dynamic_dom",
            Provenance::InterceptedNetworkJson => "intercepted_network_json",
            Provenance::DynamicRegex => "dynamic_regex",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSignal<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl ExtractedSignal<String> {
    /// Trims `raw` and returns `None` when nothing is left.
    #[must_use]
    pub fn text(raw: &str, provenance: Provenance) -> Option<Self> {
        let value = raw.trim();
        (!value.is_empty()).then(|| Self {
            value: value.to_owned(),
            provenance,
        })
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }
}

impl ExtractedSignal<u64> {
    /// Zero is indistinguishable from "not found" and yields `None`.
    #[must_use]
    pub fn count(value: u64, provenance: Provenance) -> Option<Self> {
        (value > 0).then_some(Self { value, provenance })
    }
}

impl ExtractedSignal<Vec<String>> {
    /// Normalizes keywords and returns `None` when none survive.
    #[must_use]
    pub fn keywords<I, S>(raw: I, provenance: Provenance) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let value = normalize_keywords(raw);
        (!value.is_empty()).then_some(Self { value, provenance })
    }
}

/// Trims, drops blanks and duplicates (keeping first occurrence), and keeps
/// at most [`MAX_KEYWORDS`] entries.
pub fn normalize_keywords<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::with_capacity(MAX_KEYWORDS);
    for item in raw {
        let keyword = item.as_ref().trim();
        if keyword.is_empty() || out.iter().any(|k| k == keyword) {
            continue;
        }
        out.push(keyword.to_owned());
        if out.len() == MAX_KEYWORDS {
            break;
        }
    }
    out
}

/// Tries `candidates` in priority order and returns the first value `accept`
/// yields. Selector lists, state markers and title sources all go through
/// this so their order lives in data.
pub fn first_match<C, T, I, F>(candidates: I, accept: F) -> Option<T>
where
    I: IntoIterator<Item = C>,
    F: FnMut(C) -> Option<T>,
{
    candidates.into_iter().find_map(accept)
}

/// Generic page chrome that must never be taken for a listing name.
const PLACEHOLDER_TEXT: &[&str] = &["네이버 플레이스", "네이버 지도", "NAVER", "네이버"];

/// Returns `true` for generic page chrome such as the site's own title.
#[must_use]
pub fn is_placeholder(text: &str) -> bool {
    let text = text.trim();
    PLACEHOLDER_TEXT.iter().any(|p| text.eq_ignore_ascii_case(p))
}

/// A sparse set of field values produced by one strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialRecord {
    pub name: Option<ExtractedSignal<String>>,
    pub address: Option<ExtractedSignal<String>>,
    pub description: Option<ExtractedSignal<String>>,
    pub directions: Option<ExtractedSignal<String>>,
    pub keywords: Option<ExtractedSignal<Vec<String>>>,
    pub review_count: Option<ExtractedSignal<u64>>,
    pub photo_count: Option<ExtractedSignal<u64>>,
}

impl PartialRecord {
    /// `true` when every target field carries a value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing_fields().len() == 7
    }

    /// Names of the target fields still unfilled, in record order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_none()),
            ("address", self.address.is_none()),
            ("description", self.description.is_none()),
            ("directions", self.directions.is_none()),
            ("keywords", self.keywords.is_none()),
            ("reviewCount", self.review_count.is_none()),
            ("photoCount", self.photo_count.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, missing)| missing.then_some(field))
        .collect()
    }

    /// Combines a later delta from the same strategy family: text and
    /// keywords keep the first value seen, counts keep the larger value.
    #[must_use]
    pub fn absorb(self, later: PartialRecord) -> PartialRecord {
        PartialRecord {
            name: self.name.or(later.name),
            address: self.address.or(later.address),
            description: self.description.or(later.description),
            directions: self.directions.or(later.directions),
            keywords: self.keywords.or(later.keywords),
            review_count: larger_count(self.review_count, later.review_count),
            photo_count: larger_count(self.photo_count, later.photo_count),
        }
    }

    /// Takes values from `fallback` only for fields this record lacks.
    #[must_use]
    pub fn fill_missing(self, fallback: PartialRecord) -> PartialRecord {
        PartialRecord {
            name: self.name.or(fallback.name),
            address: self.address.or(fallback.address),
            description: self.description.or(fallback.description),
            directions: self.directions.or(fallback.directions),
            keywords: self.keywords.or(fallback.keywords),
            review_count: self.review_count.or(fallback.review_count),
            photo_count: self.photo_count.or(fallback.photo_count),
        }
    }

    /// Cross-tier merge. A value from `later` replaces the current one only
    /// when it is better:
    ///
    /// - name and address prefer non-placeholder DOM text, then longer text;
    /// - description and directions prefer longer text;
    /// - counts prefer the larger value;
    /// - keywords keep the first non-empty list.
    ///
    /// Equal-length text ties go to the higher [`Provenance::rank`].
    #[must_use]
    pub fn merge(self, later: PartialRecord) -> PartialRecord {
        PartialRecord {
            name: better_label(self.name, later.name),
            address: better_label(self.address, later.address),
            description: longer_text(self.description, later.description),
            directions: longer_text(self.directions, later.directions),
            keywords: self.keywords.or(later.keywords),
            review_count: larger_count(self.review_count, later.review_count),
            photo_count: larger_count(self.photo_count, later.photo_count),
        }
    }

    /// Flattens the signals into a record; absent fields become empty or 0.
    #[must_use]
    pub fn into_record(self) -> PlaceRecord {
        PlaceRecord {
            name: self.name.map(|s| s.value).unwrap_or_default(),
            address: self.address.map(|s| s.value).unwrap_or_default(),
            description: self.description.map(|s| s.value).unwrap_or_default(),
            directions: self.directions.map(|s| s.value).unwrap_or_default(),
            keywords: self.keywords.map(|s| s.value).unwrap_or_default(),
            review_count: self.review_count.map_or(0, |s| s.value),
            photo_count: self.photo_count.map_or(0, |s| s.value),
        }
    }
}

type Text = Option<ExtractedSignal<String>>;
type Count = Option<ExtractedSignal<u64>>;

fn longer_text(current: Text, later: Text) -> Text {
    match (current, later) {
        (Some(a), Some(b)) => {
            let (la, lb) = (a.char_len(), b.char_len());
            if lb > la || (lb == la && b.provenance.rank() > a.provenance.rank()) {
                Some(b)
            } else {
                Some(a)
            }
        }
        (a, b) => a.or(b),
    }
}

fn better_label(current: Text, later: Text) -> Text {
    let is_dom = |s: &ExtractedSignal<String>| {
        s.provenance == Provenance::DynamicDom && !is_placeholder(&s.value)
    };
    match (current, later) {
        (Some(a), Some(b)) => match (is_dom(&a), is_dom(&b)) {
            (false, true) => Some(b),
            (true, false) => Some(a),
            _ => longer_text(Some(a), Some(b)),
        },
        (a, b) => a.or(b),
    }
}

fn larger_count(current: Count, later: Count) -> Count {
    match (current, later) {
        (Some(a), Some(b)) => Some(if b.value > a.value { b } else { a }),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(raw: &str, provenance: Provenance) -> Text {
        ExtractedSignal::text(raw, provenance)
    }

    #[test]
    fn merge_prefers_longer_description() {
        let a = PartialRecord {
            description: text("short", Provenance::StaticEmbeddedJson),
            ..PartialRecord::default()
        };
        let b = PartialRecord {
            description: text("a much longer description text", Provenance::DynamicRegex),
            ..PartialRecord::default()
        };
        let merged = a.merge(b).into_record();
        assert_eq!(merged.description, "a much longer description text");
    }

    #[test]
    fn merge_never_replaces_with_shorter_text() {
        let a = PartialRecord {
            directions: text("2번 출구에서 도보 3분 거리입니다", Provenance::StaticEmbeddedJson),
            ..PartialRecord::default()
        };
        let b = PartialRecord {
            directions: text("도보 3분", Provenance::DynamicDom),
            ..PartialRecord::default()
        };
        assert_eq!(a.merge(b).into_record().directions, "2번 출구에서 도보 3분 거리입니다");
    }

    #[test]
    fn merging_empty_records_yields_empty_values() {
        let merged = PartialRecord::default()
            .merge(PartialRecord {
                description: text("   ", Provenance::DynamicDom),
                ..PartialRecord::default()
            })
            .into_record();
        assert_eq!(merged, PlaceRecord::default());
    }

    #[test]
    fn merge_takes_larger_count() {
        let a = PartialRecord {
            review_count: ExtractedSignal::count(120, Provenance::StaticEmbeddedJson),
            photo_count: ExtractedSignal::count(40, Provenance::StaticEmbeddedJson),
            ..PartialRecord::default()
        };
        let b = PartialRecord {
            review_count: ExtractedSignal::count(80, Provenance::InterceptedNetworkJson),
            photo_count: ExtractedSignal::count(55, Provenance::InterceptedNetworkJson),
            ..PartialRecord::default()
        };
        let record = a.merge(b).into_record();
        assert_eq!(record.review_count, 120);
        assert_eq!(record.photo_count, 55);
    }

    #[test]
    fn dom_name_beats_longer_json_name_unless_placeholder() {
        let json = PartialRecord {
            name: text("온더그린 헤어 강남점 본점", Provenance::StaticEmbeddedJson),
            ..PartialRecord::default()
        };
        let dom = PartialRecord {
            name: text("온더그린 헤어", Provenance::DynamicDom),
            ..PartialRecord::default()
        };
        assert_eq!(json.clone().merge(dom).into_record().name, "온더그린 헤어");

        let chrome = PartialRecord {
            name: text("네이버 플레이스", Provenance::DynamicDom),
            ..PartialRecord::default()
        };
        assert_eq!(json.merge(chrome).into_record().name, "온더그린 헤어 강남점 본점");
    }

    #[test]
    fn first_keyword_list_wins_across_tiers() {
        let a = PartialRecord {
            keywords: ExtractedSignal::keywords(["커트", "펌"], Provenance::StaticEmbeddedJson),
            ..PartialRecord::default()
        };
        let b = PartialRecord {
            keywords: ExtractedSignal::keywords(["염색", "클리닉", "두피"], Provenance::DynamicDom),
            ..PartialRecord::default()
        };
        assert_eq!(a.merge(b).into_record().keywords, vec!["커트", "펌"]);
    }

    #[test]
    fn absorb_keeps_first_text_and_max_count() {
        let a = PartialRecord {
            address: text("서울 강남구 테헤란로 1", Provenance::StaticEmbeddedJson),
            review_count: ExtractedSignal::count(3, Provenance::StaticEmbeddedJson),
            ..PartialRecord::default()
        };
        let b = PartialRecord {
            address: text("서울특별시 강남구 테헤란로 1 2층", Provenance::StaticEmbeddedJson),
            review_count: ExtractedSignal::count(9, Provenance::StaticEmbeddedJson),
            ..PartialRecord::default()
        };
        let record = a.absorb(b).into_record();
        assert_eq!(record.address, "서울 강남구 테헤란로 1");
        assert_eq!(record.review_count, 9);
    }

    #[test]
    fn fill_missing_never_overrides() {
        let a = PartialRecord {
            review_count: ExtractedSignal::count(3, Provenance::StaticEmbeddedJson),
            ..PartialRecord::default()
        };
        let b = PartialRecord {
            review_count: ExtractedSignal::count(300, Provenance::StaticRegex),
            photo_count: ExtractedSignal::count(7, Provenance::StaticRegex),
            ..PartialRecord::default()
        };
        let record = a.fill_missing(b).into_record();
        assert_eq!(record.review_count, 3);
        assert_eq!(record.photo_count, 7);
    }

    #[test]
    fn keywords_are_deduplicated_and_capped() {
        let keywords = normalize_keywords([" 커트", "펌", "커트", "", "염색", "클리닉", "두피", "매직"]);
        assert_eq!(keywords, vec!["커트", "펌", "염색", "클리닉", "두피"]);
    }

    #[test]
    fn missing_fields_reports_gaps() {
        let partial = PartialRecord {
            name: text("카페", Provenance::DynamicDom),
            ..PartialRecord::default()
        };
        assert!(!partial.is_complete());
        assert!(!partial.is_empty());
        assert_eq!(partial.missing_fields().len(), 6);
        assert!(PartialRecord::default().is_empty());
    }
}
