//! Prescriptive output: improvement templates and keyword recommendations.
//!
//! Everything here is template filling parameterized by the record. Text is
//! produced for every plan; [`crate::redact`] decides what the caller sees.

use placecheck_core::{PlaceRecord, MAX_KEYWORDS};
use serde::{Deserialize, Serialize};

use crate::score::Scores;

/// Categories at or above this score get no improvement text.
pub const IMPROVEMENT_THRESHOLD: u8 = 80;

/// Target photo count used in the photo guidance.
pub const PHOTO_TARGET: u64 = 50;

const SUGGESTION_FALLBACK: &[&str] = &["예약", "후기", "추천", "전문", "친절"];

const RECOMMENDATION_FALLBACK: &[&str] = &["친절한", "예약가능", "후기좋은", "지역추천", "전문"];

/// Per-category improvement text. A field is `None` when that category
/// already scores at or above [`IMPROVEMENT_THRESHOLD`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Improvements {
    pub description: Option<String>,
    pub directions: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub review_guidance: Option<String>,
    pub photo_guidance: Option<String>,
}

#[must_use]
pub fn improvements(record: &PlaceRecord, scores: &Scores) -> Improvements {
    let needs = |score: u8| score < IMPROVEMENT_THRESHOLD;

    Improvements {
        description: needs(scores.description.score).then(|| description_template(record)),
        directions: needs(scores.directions.score).then(directions_template),
        keywords: needs(scores.keywords.score).then(|| keyword_suggestions(&record.keywords)),
        review_guidance: needs(scores.reviews.score).then(|| review_guidance(record)),
        photo_guidance: needs(scores.photos.score).then(|| photo_guidance(record.photo_count)),
    }
}

fn display_name(record: &PlaceRecord) -> &str {
    let name = record.name.trim();
    if name.is_empty() {
        "우리 매장"
    } else {
        name
    }
}

fn description_template(record: &PlaceRecord) -> String {
    let name = display_name(record);
    let address = record.address.trim();
    let location = if address.is_empty() {
        "찾아오시기 편한 곳"
    } else {
        address
    };

    format!(
        "{name}은(는) 한 번 방문한 고객이 다시 찾는 곳을 목표로 운영합니다.\n\n\
         ✅ 이런 점을 소개해 보세요\n\
         - 대표 서비스와 메뉴, 가격대\n\
         - 영업시간과 휴무일, 예약 방법\n\
         - 공간 분위기와 차별화된 강점\n\n\
         📍 위치: {location}\n\n\
         ※ 200~350자 분량에 지역명, 업종, 강점 키워드를 자연스럽게 두세 번 넣는 것이 좋습니다."
    )
}

fn directions_template() -> String {
    "🚇 지하철\n\
     - 역 이름과 출구 번호, 도보 시간(예: 3분), 눈에 띄는 건물\n\n\
     🚌 버스\n\
     - 내리는 정류장 이름과 정류장에서 오는 길(횡단보도, 골목 입구)\n\n\
     🚗 자가용\n\
     - 도로명 주소, 주차 가능 여부와 요금, 주차장 위치\n\n\
     ※ 출구 번호와 도보 시간처럼 숫자가 들어간 안내가 예약 전환에 가장 효과적입니다."
        .to_owned()
}

/// The listing's own keywords topped up with generic terms.
#[must_use]
pub fn keyword_suggestions(own: &[String]) -> Vec<String> {
    distinct_capped(
        own.iter()
            .map(String::as_str)
            .chain(SUGGESTION_FALLBACK.iter().copied()),
    )
}

fn review_guidance(record: &PlaceRecord) -> String {
    let name = display_name(record);
    let photo_ask = if record.photo_count > 0 {
        "사진도 함께 남겨주시면"
    } else {
        "사진 한 장만 더해주셔도"
    };

    format!(
        "✅ {name} 리뷰 요청 흐름\n\
         1) 이용이 끝난 직후: \"만족하셨다면 리뷰 한 줄 부탁드려요 😊\"\n\
         2) 가능하다면: \"{photo_ask} 큰 힘이 됩니다!\"\n\n\
         ✅ 답글 예시\n\
         - \"소중한 리뷰 감사합니다. 다음 방문에도 만족하실 수 있도록 준비하겠습니다!\"\n\n\
         🎯 목표: 리뷰 50개 이상, 사진 리뷰 비율 늘리기"
    )
}

fn photo_guidance(photo_count: u64) -> String {
    let missing = PHOTO_TARGET.saturating_sub(photo_count);
    format!(
        "📸 현재 사진 {photo_count}장 / 목표 {PHOTO_TARGET}장 ({missing}장 추가 권장)\n\
         - 외관과 간판: 처음 오는 손님이 찾기 쉽게\n\
         - 내부 공간: 좌석, 분위기, 청결함\n\
         - 대표 메뉴나 서비스, 가격표\n\
         - 계절마다 새 사진으로 교체하면 최신 정보로 보입니다."
    )
}

/// Search terms built from the address's administrative areas, the first
/// token of the name, and fixed domain terms.
#[must_use]
pub fn recommended_keywords(record: &PlaceRecord) -> Vec<String> {
    let mut parts = record.address.split_whitespace();
    let city = parts.next();
    let district = parts.next();
    let base = record.name.split_whitespace().next();

    let derived: Vec<String> = [
        district.map(|d| format!("{d}추천")),
        district.map(|d| format!("{d}예약")),
        city.map(|c| format!("{c}후기")),
        base.map(|b| format!("{b}전문")),
    ]
    .into_iter()
    .flatten()
    .collect();

    distinct_capped(
        derived
            .iter()
            .map(String::as_str)
            .chain(RECOMMENDATION_FALLBACK.iter().copied()),
    )
}

fn distinct_capped<'a>(terms: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(MAX_KEYWORDS);
    for term in terms.map(str::trim).filter(|t| !t.is_empty()) {
        if out.len() == MAX_KEYWORDS {
            break;
        }
        if !out.iter().any(|existing| existing == term) {
            out.push(term.to_owned());
        }
    }
    out
}
