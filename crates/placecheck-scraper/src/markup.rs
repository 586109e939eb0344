//! Field extraction from raw page markup.
//!
//! Embedded state blobs are tried in priority order and scanned as JSON;
//! regex fallbacks then fill whatever is still missing. The fallbacks accept
//! both plain and JSON-escaped string forms, plus visible counter text such
//! as `방문자리뷰 1,927` or a bare `리뷰 1,927`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::scan::{
    parse_count_str, scan, ADDRESS_FIELDS, DESCRIPTION_FIELDS, DIRECTIONS_FIELDS, NAME_FIELDS,
    PHOTO_COUNT_FIELDS, REVIEW_COUNT_FIELDS,
};
use crate::signal::{first_match, is_placeholder, ExtractedSignal, PartialRecord, Provenance};
use crate::slice::slice_after_marker;

/// Which extraction tier produced a piece of markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Static,
    Dynamic,
}

impl Tier {
    #[must_use]
    pub fn embedded(self) -> Provenance {
        match self {
            Tier::Static => Provenance::StaticEmbeddedJson,
            Tier::Dynamic => Provenance::DynamicEmbeddedJson,
        }
    }

    #[must_use]
    pub fn regex(self) -> Provenance {
        match self {
            Tier::Static => Provenance::StaticRegex,
            Tier::Dynamic => Provenance::DynamicRegex,
        }
    }
}

/// Places where a page hands its state to client-side code.
#[derive(Debug, Clone, Copy)]
enum StateSource {
    /// `<script id="...">{json}</script>`
    ScriptById(&'static str),
    /// `... MARKER = {json};`
    AfterMarker(&'static str),
}

const STATE_SOURCES: &[StateSource] = &[
    StateSource::ScriptById("__NEXT_DATA__"),
    StateSource::AfterMarker("__APOLLO_STATE__"),
];

static SCRIPT_WITH_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*\bid\s*=\s*["']([^"']+)["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));

static OG_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+property\s*=\s*["']og:title["']\s+content\s*=\s*["']([^"']*)["']"#)
        .expect("valid regex")
});

static KEYWORD_LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\?"keywordList\\?"\s*:"#).expect("valid regex"));

static KEYWORD_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\?"(?:text|name)\\?"\s*:\s*\\?"((?:[^"\\]|\\[^"])*)\\?""#).expect("valid regex")
});

/// Site suffixes appended to listing titles.
const TITLE_SUFFIXES: &[&str] = &[" : 네이버 플레이스", " : 네이버", " - 네이버 플레이스", " - 네이버 지도"];

/// Visible counter labels in priority order, tolerant of inline tags between
/// label and number. The bare `리뷰` label must not sit right after Hangul so
/// it never re-reads a `방문자리뷰` or `블로그 리뷰` counter.
const VISIBLE_REVIEW_LABELS: &[&str] = &[r"방문자\s*리뷰", r"(?:^|[^가-힣\s])\s*리뷰", r"블로그\s*리뷰"];
const VISIBLE_PHOTO_LABELS: &[&str] = &[r"사진"];

/// A string-field pattern and how many JSON string layers wrap its capture.
struct TextPattern {
    re: Regex,
    layers: usize,
}

impl TextPattern {
    fn decode(&self, raw: &str) -> String {
        (0..self.layers).fold(raw.to_owned(), |text, _| unescape_json_text(&text))
    }
}

/// Embedded-JSON count fields, then visible counter labels.
struct CountPatterns {
    json: Regex,
    visible: Vec<Regex>,
}

impl CountPatterns {
    /// The largest JSON-field count; failing that, the first visible counter
    /// of the highest-priority label that has one.
    fn find(&self, markup: &str) -> u64 {
        let numbers = |re: &Regex| {
            re.captures_iter(markup)
                .filter_map(|cap| cap.get(1))
                .map(|m| parse_count_str(m.as_str()))
                .filter(|n| *n > 0)
                .collect::<Vec<_>>()
        };
        numbers(&self.json)
            .into_iter()
            .max()
            .or_else(|| first_match(&self.visible, |re| numbers(re).first().copied()))
            .unwrap_or(0)
    }
}

struct FallbackPatterns {
    name: Vec<TextPattern>,
    address: Vec<TextPattern>,
    description: Vec<TextPattern>,
    directions: Vec<TextPattern>,
    review_count: CountPatterns,
    photo_count: CountPatterns,
}

static FALLBACKS: LazyLock<FallbackPatterns> = LazyLock::new(|| FallbackPatterns {
    name: string_field_patterns(NAME_FIELDS),
    address: string_field_patterns(&ADDRESS_FIELDS[..2]),
    description: string_field_patterns(&DESCRIPTION_FIELDS[..2]),
    directions: string_field_patterns(&[DIRECTIONS_FIELDS[0], DIRECTIONS_FIELDS[2]]),
    review_count: count_patterns(REVIEW_COUNT_FIELDS, VISIBLE_REVIEW_LABELS),
    photo_count: count_patterns(PHOTO_COUNT_FIELDS, VISIBLE_PHOTO_LABELS),
});

/// Two patterns per field, in field order: the plain JSON form, then the form
/// embedded in another JSON string where every quote arrives as `\"`.
fn string_field_patterns(fields: &[&str]) -> Vec<TextPattern> {
    fields
        .iter()
        .flat_map(|field| {
            let plain = Regex::new(&format!(r#""{field}"\s*:\s*"((?:[^"\\]|\\.)*)""#))
                .expect("valid regex");
            let nested = Regex::new(&format!(
                r#"\\"{field}\\"\s*:\s*\\"((?:\\\\\\"|\\\\\\\\|\\\\[^"\\]|\\[^"\\]|[^"\\])*)\\""#
            ))
            .expect("valid regex");
            [
                TextPattern { re: plain, layers: 1 },
                TextPattern { re: nested, layers: 2 },
            ]
        })
        .collect()
}

fn count_patterns(fields: &[&str], labels: &[&str]) -> CountPatterns {
    let json = Regex::new(&format!(
        r#"\\?"(?:{})\\?"\s*:\s*\\?"?([0-9][0-9,]*)"#,
        fields.join("|")
    ))
    .expect("valid regex");
    let visible = labels
        .iter()
        .map(|label| {
            Regex::new(&format!(r"{label}\s*(?:<[^>]*>\s*)*([0-9][0-9,]*)")).expect("valid regex")
        })
        .collect();
    CountPatterns { json, visible }
}

impl StateSource {
    fn locate(self, markup: &str) -> Option<Value> {
        let raw = match self {
            StateSource::ScriptById(id) => SCRIPT_WITH_ID
                .captures_iter(markup)
                .find(|cap| cap.get(1).is_some_and(|m| m.as_str() == id))
                .and_then(|cap| cap.get(2))
                .map(|m| m.as_str().trim())?,
            StateSource::AfterMarker(marker) => slice_after_marker(markup, marker)?,
        };
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(source = ?self, error = %e, "embedded state did not parse");
                None
            }
        }
    }
}

/// Extracts every field `markup` exposes, tagging values with `tier`.
#[must_use]
pub fn harvest_markup(markup: &str, tier: Tier) -> PartialRecord {
    let found = harvest_embedded(markup, tier);
    if found.is_complete() {
        return found;
    }
    found.fill_missing(regex_fallback(markup, tier.regex()))
}

/// Scans the embedded state blobs only. Later blobs are consulted while any
/// field is still unfilled.
#[must_use]
pub fn harvest_embedded(markup: &str, tier: Tier) -> PartialRecord {
    let mut found = PartialRecord::default();
    for source in STATE_SOURCES {
        if found.is_complete() {
            break;
        }
        if let Some(doc) = source.locate(markup) {
            let delta = scan(&doc, tier.embedded());
            tracing::debug!(source = ?source, missing = ?delta.missing_fields(), "scanned embedded state");
            found = found.absorb(delta);
        }
    }
    found
}

/// Last-resort pattern matching over the raw markup.
#[must_use]
pub fn regex_fallback(markup: &str, provenance: Provenance) -> PartialRecord {
    let patterns = &*FALLBACKS;
    PartialRecord {
        name: first_string(markup, &patterns.name, 1, provenance)
            .or_else(|| title_name(markup, provenance)),
        address: first_string(markup, &patterns.address, 5, provenance),
        description: first_string(markup, &patterns.description, 15, provenance),
        directions: first_string(markup, &patterns.directions, 15, provenance),
        keywords: keyword_fallback(markup, provenance),
        review_count: ExtractedSignal::count(patterns.review_count.find(markup), provenance),
        photo_count: ExtractedSignal::count(patterns.photo_count.find(markup), provenance),
    }
}

/// Derives a listing name from a page title by stripping the site suffix.
/// Generic titles yield `None`.
#[must_use]
pub fn name_from_title(title: &str, provenance: Provenance) -> Option<ExtractedSignal<String>> {
    let mut name = title.trim();
    for suffix in TITLE_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped;
            break;
        }
    }
    if is_placeholder(name) {
        return None;
    }
    ExtractedSignal::text(name, provenance)
}

fn title_name(markup: &str, provenance: Provenance) -> Option<ExtractedSignal<String>> {
    first_match([&*OG_TITLE, &*TITLE], |re| {
        let raw = re.captures(markup)?.get(1)?;
        name_from_title(&decode_entities(raw.as_str()), provenance)
    })
}

fn first_string(
    markup: &str,
    patterns: &[TextPattern],
    min_chars: usize,
    provenance: Provenance,
) -> Option<ExtractedSignal<String>> {
    first_match(patterns, |pattern| {
        pattern
            .re
            .captures_iter(markup)
            .filter_map(|cap| cap.get(1))
            .map(|m| pattern.decode(m.as_str()))
            .filter(|s| s.trim().chars().count() >= min_chars)
            .find_map(|s| ExtractedSignal::text(&s, provenance))
    })
}

fn keyword_fallback(markup: &str, provenance: Provenance) -> Option<ExtractedSignal<Vec<String>>> {
    let marker = KEYWORD_LIST_MARKER.find(markup)?;
    // Parse the list as JSON when it is unescaped; otherwise pick item
    // strings out of a bounded window.
    if let Some(Value::Array(items)) = slice_after_marker(markup, marker.as_str())
        .filter(|_| !marker.as_str().starts_with('\\'))
        .and_then(|raw| serde_json::from_str(raw).ok())
    {
        let texts = items.iter().filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("text").or_else(|| obj.get("name"))?.as_str(),
            _ => None,
        });
        if let Some(signal) = ExtractedSignal::keywords(texts, provenance) {
            return Some(signal);
        }
    }
    let window_end = markup[marker.end()..]
        .find(']')
        .map_or(markup.len(), |i| marker.end() + i);
    let window = &markup[marker.end()..window_end];
    ExtractedSignal::keywords(
        KEYWORD_ITEM
            .captures_iter(window)
            .filter_map(|cap| cap.get(1))
            .map(|m| unescape_json_text(m.as_str())),
        provenance,
    )
}

/// Decodes JSON string escapes; returns the raw text when it is not a valid
/// JSON string body.
fn unescape_json_text(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_owned())
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEXT_DATA_PAGE: &str = r#"<html><head><title>온더그린 헤어 : 네이버</title></head><body>
<script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"place":{
  "placeName":"온더그린 헤어","roadAddress":"서울 강남구 테헤란로 123",
  "keywordList":[{"text":"커트"},{"text":"펌"}],"visitorReviewCount":"1,927","photoCount":88}}}}</script>
</body></html>"#;

    #[test]
    fn next_data_script_is_scanned() {
        let record = harvest_markup(NEXT_DATA_PAGE, Tier::Static).into_record();
        assert_eq!(record.name, "온더그린 헤어");
        assert_eq!(record.address, "서울 강남구 테헤란로 123");
        assert_eq!(record.keywords, vec!["커트", "펌"]);
        assert_eq!(record.review_count, 1927);
        assert_eq!(record.photo_count, 88);
    }

    #[test]
    fn apollo_state_after_marker_is_scanned() {
        let page = r#"<script>window.__APOLLO_STATE__ = {"PlaceDetailBase:1":{"name":"x",
"placeName":"카페 온도","directions":"2호선 강남역 10번 출구에서 도보 5분 거리입니다","reviewCount":42}};</script>"#;
        let found = harvest_markup(page, Tier::Dynamic);
        assert_eq!(
            found.directions.as_ref().map(|s| s.provenance),
            Some(Provenance::DynamicEmbeddedJson)
        );
        let record = found.into_record();
        assert_eq!(record.name, "카페 온도");
        assert_eq!(record.review_count, 42);
    }

    #[test]
    fn regex_fills_only_missing_fields() {
        let page = r#"<script id="__NEXT_DATA__">{"placeName":"카페 온도"}</script>
<div>방문자리뷰 <em>1,234</em></div><span>사진 56</span>"#;
        let found = harvest_markup(page, Tier::Static);
        assert_eq!(found.name.as_ref().map(|s| s.provenance), Some(Provenance::StaticEmbeddedJson));
        assert_eq!(
            found.review_count.as_ref().map(|s| (s.value, s.provenance)),
            Some((1234, Provenance::StaticRegex))
        );
        assert_eq!(found.photo_count.map(|s| s.value), Some(56));
    }

    #[test]
    fn escaped_json_strings_are_matched_and_decoded() {
        let page = r#"<script>self.__next_f.push([1,"{\"roadAddress\":\"서울 마포구 양화로 45\",\"introduction\":\"합정역 앞 스페셜티 커피 로스터리 카페입니다\",\"keywordList\":[{\"text\":\"커피\"},{\"text\":\"디저트\"}]}"])</script>"#;
        let record = harvest_markup(page, Tier::Static).into_record();
        assert_eq!(record.address, "서울 마포구 양화로 45");
        assert_eq!(record.description, "합정역 앞 스페셜티 커피 로스터리 카페입니다");
        assert_eq!(record.keywords, vec!["커피", "디저트"]);
    }

    #[test]
    fn plain_json_text_keeps_escaped_quotes() {
        let page = r#"<script>{"introduction":"\"최고\"의 원두로 내리는 스페셜티 커피 전문점입니다"}</script>"#;
        let found = regex_fallback(page, Provenance::StaticRegex);
        assert_eq!(
            found.description.map(|s| s.value).as_deref(),
            Some("\"최고\"의 원두로 내리는 스페셜티 커피 전문점입니다")
        );
    }

    #[test]
    fn nested_json_text_keeps_escaped_quotes() {
        let page = r#"<script>self.__next_f.push([1,"{\"introduction\":\"\\\"최고\\\"의 원두로 내리는 스페셜티 커피 전문점입니다\"}"])</script>"#;
        let found = regex_fallback(page, Provenance::StaticRegex);
        assert_eq!(
            found.description.map(|s| s.value).as_deref(),
            Some("\"최고\"의 원두로 내리는 스페셜티 커피 전문점입니다")
        );
    }

    #[test]
    fn bare_review_counter_is_read() {
        let found = regex_fallback("<div><span>리뷰 1,927</span></div>", Provenance::StaticRegex);
        assert_eq!(found.review_count.map(|s| s.value), Some(1927));
    }

    #[test]
    fn bare_review_label_leaves_labelled_counters_alone() {
        let blog_only = regex_fallback("<span>블로그 리뷰 30</span>", Provenance::StaticRegex);
        assert_eq!(blog_only.review_count.map(|s| s.value), Some(30));

        let both = "<span>블로그리뷰 3,000</span><span>방문자리뷰 120</span>";
        let found = regex_fallback(both, Provenance::StaticRegex);
        assert_eq!(found.review_count.map(|s| s.value), Some(120));
    }

    #[test]
    fn json_counts_outrank_visible_counters() {
        let page = r#"<script>{"visitorReviewCount":"42","photoCount":7}</script>
<p>사진 10장 이상 첨부 시 포인트 지급</p><span>블로그리뷰 3,000</span>"#;
        let found = regex_fallback(page, Provenance::StaticRegex);
        assert_eq!(found.review_count.map(|s| s.value), Some(42));
        assert_eq!(found.photo_count.map(|s| s.value), Some(7));
    }

    #[test]
    fn first_visible_counter_wins_over_later_larger_ones() {
        let page = "<span>사진 56</span><p>사진 10장 이상 첨부 시 포인트 지급</p><p>사진 100</p>";
        let found = regex_fallback(page, Provenance::StaticRegex);
        assert_eq!(found.photo_count.map(|s| s.value), Some(56));
    }

    #[test]
    fn title_is_last_resort_for_name() {
        let page = "<html><head><title>카페 온도 : 네이버</title></head></html>";
        assert_eq!(harvest_markup(page, Tier::Static).into_record().name, "카페 온도");

        let generic = "<html><head><title>네이버 플레이스</title></head></html>";
        assert_eq!(harvest_markup(generic, Tier::Static).into_record().name, "");
    }

    #[test]
    fn malformed_state_falls_through_to_regex() {
        let page = r#"<script id="__NEXT_DATA__">{"placeName":"카페 온도",</script>
<script>"placeName":"카페 온도 본점"</script>"#;
        assert_eq!(harvest_markup(page, Tier::Static).into_record().name, "카페 온도");
    }

    #[test]
    fn empty_markup_yields_empty_record() {
        assert!(harvest_markup("", Tier::Dynamic).is_empty());
    }
}
