use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use placecheck_core::{CompetitorRecord, PlaceRecord, Plan};
use placecheck_diagnosis::{diagnose, redact, DiagnosisReport, Grade, Improvements, Scores};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::middleware::RequestId;
use crate::service::PlaceSource;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub input: AnalyzeInput,
    #[serde(default)]
    pub options: AnalyzeOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeInput {
    #[serde(default)]
    pub place_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOptions {
    #[serde(default)]
    pub plan: Plan,
    pub search_query: Option<String>,
}

/// Body of the single-purpose `/diagnose/*` routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRequest {
    #[serde(default)]
    pub place_url: String,
    pub search_query: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub meta: AnalyzeMeta,
    pub place: PlaceRecord,
    pub scores: Scores,
    pub recommend: Recommend,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeMeta {
    pub fetched_at: DateTime<Utc>,
    pub plan: Plan,
    pub request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommend {
    pub total_score: u8,
    pub total_grade: Grade,
    pub improvements: Option<Improvements>,
    pub recommended_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitors: Option<Vec<CompetitorRecord>>,
}

#[derive(Debug, Serialize)]
pub struct LegacyResponse {
    pub success: bool,
    pub data: DiagnosisReport,
}

impl AnalyzeResponse {
    fn new(report: DiagnosisReport, plan: Plan, request_id: String) -> Self {
        Self {
            success: true,
            meta: AnalyzeMeta {
                fetched_at: Utc::now(),
                plan,
                request_id,
            },
            place: report.place,
            scores: report.scores,
            recommend: Recommend {
                total_score: report.total_score,
                total_grade: report.total_grade,
                improvements: report.improvements,
                recommended_keywords: report.recommended_keywords,
                competitors: report.competitors,
            },
        }
    }
}

/// Extract, score, attach competitors (pro only) and apply the plan gate.
pub(super) async fn run_diagnosis(
    source: &dyn PlaceSource,
    place_url: &str,
    plan: Plan,
    search_query: Option<&str>,
) -> Result<DiagnosisReport, ApiError> {
    let place_url = place_url.trim();
    if place_url.is_empty() {
        return Err(ApiError::bad_request("placeUrl is required"));
    }

    let record = source.extract(place_url).await.map_err(ApiError::from)?;
    let mut report = diagnose(record);
    tracing::info!(
        plan = %plan,
        total_score = report.total_score,
        grade = %report.total_grade,
        "listing diagnosed"
    );

    let term = search_query
        .map(str::trim)
        .filter(|t| !t.is_empty() && plan.is_paid());
    if let Some(term) = term {
        match source.competitors(term).await {
            Ok(competitors) => report = report.with_competitors(competitors),
            Err(e) => tracing::warn!(term, error = %e, "competitor analysis unavailable"),
        }
    }

    Ok(redact(report, plan))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

pub(super) async fn analyze(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let request = body(payload)?;
    let plan = request.options.plan;
    let report = run_diagnosis(
        state.source.as_ref(),
        &request.input.place_url,
        plan,
        request.options.search_query.as_deref(),
    )
    .await?;
    Ok(Json(AnalyzeResponse::new(report, plan, req_id.0)))
}

pub(super) async fn diagnose_free(
    State(state): State<AppState>,
    payload: Result<Json<LegacyRequest>, JsonRejection>,
) -> Result<Json<LegacyResponse>, ApiError> {
    let request = body(payload)?;
    let report = run_diagnosis(state.source.as_ref(), &request.place_url, Plan::Free, None).await?;
    Ok(Json(LegacyResponse {
        success: true,
        data: report,
    }))
}

pub(super) async fn diagnose_paid(
    State(state): State<AppState>,
    payload: Result<Json<LegacyRequest>, JsonRejection>,
) -> Result<Json<LegacyResponse>, ApiError> {
    let request = body(payload)?;
    let report = run_diagnosis(
        state.source.as_ref(),
        &request.place_url,
        Plan::Pro,
        request.search_query.as_deref(),
    )
    .await?;
    Ok(Json(LegacyResponse {
        success: true,
        data: report,
    }))
}
