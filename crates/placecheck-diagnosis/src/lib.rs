//! Deterministic diagnosis of a [`placecheck_core::PlaceRecord`].
//!
//! Scoring is pure: the same record always yields the same report. Plan
//! gating happens afterwards via [`redact`], so the verdict (scores, grades,
//! issues) is identical for every plan and only the prescriptive text differs.

pub mod gate;
pub mod grade;
pub mod improve;
pub mod report;
pub mod score;

pub use gate::{redact, LOCK_MARKER};
pub use grade::Grade;
pub use improve::{improvements, recommended_keywords, Improvements};
pub use report::{diagnose, DiagnosisReport};
pub use score::{
    score_description, score_directions, score_keywords, score_photos, score_reviews,
    total_score, CategoryScore, Scores,
};
