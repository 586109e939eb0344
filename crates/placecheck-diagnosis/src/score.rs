//! Per-category scoring.
//!
//! Text categories start at 100 and subtract penalties (floored at 0); count
//! categories map directly onto ordinal bands. Lengths are measured in
//! characters, not bytes.

use placecheck_core::{PlaceRecord, MAX_KEYWORDS};
use serde::{Deserialize, Serialize};

use crate::grade::Grade;

const FULL: u8 = 100;

/// Terms that show the description covers how to use the business.
const OPERATIONAL_TERMS: &[&str] = &[
    "영업시간", "운영시간", "이용시간", "휴무", "가격", "요금", "메뉴", "서비스", "예약", "시술",
];

/// Terms that show the directions cover transit or parking.
const TRANSIT_TERMS: &[&str] = &[
    "지하철", "출구", "버스", "정류장", "주차", "도보", "역에서", "역 ",
];

/// `(exclusive upper bound, score, issue)` for review counts.
const REVIEW_BANDS: &[(u64, u8, &str)] = &[
    (1, 0, "리뷰가 없습니다."),
    (10, 30, "리뷰 10개 이상 확보를 권장합니다."),
    (50, 60, "리뷰 50개 이상이면 노출이 더 안정적입니다."),
    (100, 80, "리뷰 100개 이상이면 신뢰도가 한층 올라갑니다."),
];

const PHOTO_BANDS: &[(u64, u8, &str)] = &[
    (1, 0, "사진이 없습니다."),
    (10, 30, "사진 10장 이상(외관/내부/메뉴/가격표)을 권장합니다."),
    (30, 60, "대표사진 구성을 보강하면 전환율이 올라갑니다."),
    (50, 80, "사진 50장 이상이면 둘러보는 시간이 늘어납니다."),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub score: u8,
    pub grade: Grade,
    pub issues: Vec<String>,
}

impl CategoryScore {
    fn new(score: u8, issues: Vec<String>) -> Self {
        Self {
            score,
            grade: Grade::from_score(score),
            issues,
        }
    }
}

/// The five fixed categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub description: CategoryScore,
    pub directions: CategoryScore,
    pub keywords: CategoryScore,
    pub reviews: CategoryScore,
    pub photos: CategoryScore,
}

impl Scores {
    #[must_use]
    pub fn for_record(record: &PlaceRecord) -> Self {
        Self {
            description: score_description(&record.description),
            directions: score_directions(&record.directions),
            keywords: score_keywords(&record.keywords),
            reviews: score_reviews(record.review_count),
            photos: score_photos(record.photo_count),
        }
    }

    #[must_use]
    pub fn values(&self) -> [u8; 5] {
        [
            self.description.score,
            self.directions.score,
            self.keywords.score,
            self.reviews.score,
            self.photos.score,
        ]
    }
}

/// Accumulates penalties from a full score.
struct Penalties {
    score: u8,
    issues: Vec<String>,
}

impl Penalties {
    fn new() -> Self {
        Self {
            score: FULL,
            issues: Vec::new(),
        }
    }

    fn apply(&mut self, points: u8, issue: &str) {
        self.score = self.score.saturating_sub(points);
        self.issues.push(issue.to_owned());
    }

    fn finish(self) -> CategoryScore {
        CategoryScore::new(self.score, self.issues)
    }
}

fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

#[must_use]
pub fn score_description(description: &str) -> CategoryScore {
    let text = description.trim();
    if text.is_empty() {
        return CategoryScore::new(0, vec!["상세설명이 없습니다.".to_owned()]);
    }

    let mut penalties = Penalties::new();
    let length = text.chars().count();
    if length < 100 {
        penalties.apply(30, "상세설명이 너무 짧습니다 (최소 150~200자 권장)");
    } else if length < 200 {
        penalties.apply(15, "200자 이상으로 확장하면 검색/전환에 더 유리합니다.");
    }
    if !mentions_any(text, OPERATIONAL_TERMS) {
        penalties.apply(20, "영업시간/가격/메뉴 등 이용 정보를 함께 적어보세요.");
    }
    penalties.finish()
}

#[must_use]
pub fn score_directions(directions: &str) -> CategoryScore {
    let text = directions.trim();
    if text.is_empty() {
        return CategoryScore::new(0, vec!["오시는길 정보가 없습니다.".to_owned()]);
    }

    let mut penalties = Penalties::new();
    if text.chars().count() < 50 {
        penalties.apply(30, "출구/도보시간/랜드마크 등 구체 정보가 부족합니다.");
    }
    if !mentions_any(text, TRANSIT_TERMS) {
        penalties.apply(25, "주차/버스/도보 동선 정보를 더 명확히 적어보세요.");
    }
    penalties.finish()
}

#[must_use]
pub fn score_keywords(keywords: &[String]) -> CategoryScore {
    let count = keywords.iter().filter(|k| !k.trim().is_empty()).count();
    match count {
        0 => CategoryScore::new(0, vec!["대표키워드가 비어있습니다.".to_owned()]),
        1 | 2 => {
            let mut penalties = Penalties::new();
            penalties.apply(40, "대표키워드를 5개까지 채우는 것을 권장합니다.");
            penalties.finish()
        }
        n if n < MAX_KEYWORDS => {
            let mut penalties = Penalties::new();
            penalties.apply(20, "대표키워드 5개를 모두 채우면 노출 안정성이 올라갑니다.");
            penalties.finish()
        }
        _ => CategoryScore::new(FULL, Vec::new()),
    }
}

fn banded(count: u64, bands: &[(u64, u8, &str)]) -> CategoryScore {
    bands
        .iter()
        .find(|(below, _, _)| count < *below)
        .map_or_else(
            || CategoryScore::new(FULL, Vec::new()),
            |(_, score, issue)| CategoryScore::new(*score, vec![(*issue).to_owned()]),
        )
}

#[must_use]
pub fn score_reviews(review_count: u64) -> CategoryScore {
    banded(review_count, REVIEW_BANDS)
}

#[must_use]
pub fn score_photos(photo_count: u64) -> CategoryScore {
    banded(photo_count, PHOTO_BANDS)
}

/// Rounded arithmetic mean, halves rounding up.
#[must_use]
pub fn total_score(scores: &[u8]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u32 = scores.iter().map(|s| u32::from(*s)).sum();
    let n = u32::try_from(scores.len()).unwrap_or(u32::MAX);
    let mean = (2 * sum + n) / (2 * n);
    u8::try_from(mean).unwrap_or(FULL)
}

#[cfg(test)]
#[path = "score_test.rs"]
mod tests;
