use placecheck_core::{CompetitorRecord, PlaceRecord};
use serde::{Deserialize, Serialize};

use crate::grade::Grade;
use crate::improve::{improvements, recommended_keywords, Improvements};
use crate::score::{total_score, Scores};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    pub place: PlaceRecord,
    pub scores: Scores,
    pub total_score: u8,
    pub total_grade: Grade,
    pub improvements: Option<Improvements>,
    pub recommended_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitors: Option<Vec<CompetitorRecord>>,
}

impl DiagnosisReport {
    #[must_use]
    pub fn with_competitors(mut self, competitors: Vec<CompetitorRecord>) -> Self {
        self.competitors = Some(competitors);
        self
    }
}

/// Scores `record` and fills in the full prescriptive output. Pass the result
/// through [`crate::redact`] before handing it to a caller.
#[must_use]
pub fn diagnose(record: PlaceRecord) -> DiagnosisReport {
    let scores = Scores::for_record(&record);
    let total = total_score(&scores.values());
    let improvements = improvements(&record, &scores);
    let recommended_keywords = recommended_keywords(&record);

    DiagnosisReport {
        total_score: total,
        total_grade: Grade::from_score(total),
        improvements: Some(improvements),
        recommended_keywords,
        competitors: None,
        scores,
        place: record,
    }
}
