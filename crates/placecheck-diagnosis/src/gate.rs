//! Plan gate: hides prescriptive output from free callers.

use placecheck_core::{Plan, MAX_KEYWORDS};

use crate::improve::Improvements;
use crate::report::DiagnosisReport;

pub const LOCK_MARKER: &str = "🔒 유료 리포트에서 제공됩니다.";

/// Returns `report` unchanged for paid plans. For free plans every
/// improvement field, recommended keyword and competitor keyword is replaced
/// by [`LOCK_MARKER`]; scores, grades and issues are left alone.
#[must_use]
pub fn redact(mut report: DiagnosisReport, plan: Plan) -> DiagnosisReport {
    if plan.is_paid() {
        return report;
    }

    let suggestion_slots = report
        .improvements
        .as_ref()
        .and_then(|set| set.keywords.as_ref())
        .map_or(MAX_KEYWORDS, Vec::len);
    report.improvements = Some(Improvements {
        description: Some(locked()),
        directions: Some(locked()),
        keywords: Some(vec![locked(); suggestion_slots]),
        review_guidance: Some(locked()),
        photo_guidance: Some(locked()),
    });

    lock_all(&mut report.recommended_keywords);
    for competitor in report.competitors.iter_mut().flatten() {
        lock_all(&mut competitor.keywords);
    }
    report
}

fn locked() -> String {
    LOCK_MARKER.to_owned()
}

fn lock_all(keywords: &mut [String]) {
    for keyword in keywords {
        *keyword = locked();
    }
}

#[cfg(test)]
mod tests {
    use placecheck_core::{CompetitorRecord, PlaceRecord};

    use super::*;
    use crate::report::diagnose;

    fn sample() -> DiagnosisReport {
        let record = PlaceRecord {
            name: "한결치과".to_owned(),
            address: "서울 마포구 합정동".to_owned(),
            description: "짧은 소개".to_owned(),
            keywords: vec!["치과".to_owned()],
            review_count: 20,
            ..PlaceRecord::default()
        };
        diagnose(record).with_competitors(vec![CompetitorRecord {
            name: "옆집치과".to_owned(),
            keywords: vec!["임플란트".to_owned(), "교정".to_owned()],
            ..CompetitorRecord::default()
        }])
    }

    #[test]
    fn free_plan_locks_prescriptive_output() {
        let full = sample();
        let redacted = redact(full.clone(), Plan::Free);

        let improvements = redacted.improvements.as_ref().expect("improvements");
        assert_eq!(improvements.description.as_deref(), Some(LOCK_MARKER));
        assert_eq!(improvements.photo_guidance.as_deref(), Some(LOCK_MARKER));
        assert!(improvements
            .keywords
            .iter()
            .flatten()
            .all(|k| k == LOCK_MARKER));
        assert!(redacted.recommended_keywords.iter().all(|k| k == LOCK_MARKER));
        assert_eq!(redacted.recommended_keywords.len(), full.recommended_keywords.len());

        let competitors = redacted.competitors.as_ref().expect("competitors");
        assert_eq!(competitors[0].name, "옆집치과");
        assert_eq!(competitors[0].keywords, vec![LOCK_MARKER, LOCK_MARKER]);
    }

    #[test]
    fn free_plan_keeps_the_verdict() {
        let full = sample();
        let redacted = redact(full.clone(), Plan::Free);
        assert_eq!(redacted.scores, full.scores);
        assert_eq!(redacted.total_score, full.total_score);
        assert_eq!(redacted.total_grade, full.total_grade);
        assert_eq!(redacted.place, full.place);
    }

    #[test]
    fn free_plan_locks_even_strong_categories() {
        let mut full = sample();
        if let Some(set) = full.improvements.as_mut() {
            set.description = None;
        }
        let redacted = redact(full, Plan::Free);
        let description = redacted.improvements.and_then(|set| set.description);
        assert_eq!(description.as_deref(), Some(LOCK_MARKER));
    }

    #[test]
    fn pro_plan_is_identity() {
        let full = sample();
        let redacted = redact(full.clone(), Plan::Pro);
        assert_eq!(redacted, full);

        let description = redacted
            .improvements
            .and_then(|set| set.description)
            .expect("description template");
        assert!(description.starts_with("한결치과은(는)"));
        assert!(description.contains("서울 마포구 합정동"));
    }
}
