mod diagnose;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use placecheck_scraper::ExtractError;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState};
use crate::service::PlaceSource;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn PlaceSource>,
}

/// JSON error body: `{ "error": <summary>, "message": <detail> }`.
#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    message: &'static str,
}

impl ApiError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    pub fn rate_limited() -> Self {
        Self::new("rate_limited", "rate limit exceeded, try again shortly")
    }

    fn status(&self) -> StatusCode {
        match self.code {
            "bad_request" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn summary(&self) -> &'static str {
        match self.code {
            "bad_request" => "플레이스 URL을 확인해주세요",
            "rate_limited" => "요청이 너무 많습니다",
            _ => "진단 중 오류가 발생했습니다",
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::Identity(e) => Self::bad_request(e.to_string()),
            other => {
                tracing::error!(error = %other, "extraction failed");
                Self::new("internal_error", other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.summary(),
            message: &self.message,
        };
        (self.status(), Json(body)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn routes(rate_limit: RateLimitState) -> Router<AppState> {
    let diagnosis = Router::new()
        .route("/analyze", post(diagnose::analyze))
        .route("/diagnose/free", post(diagnose::diagnose_free))
        .route("/diagnose/paid", post(diagnose::diagnose_paid))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ));

    Router::new().route("/health", get(health)).merge(diagnosis)
}

/// Routes are served at the bare paths and again under `/api`.
pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let routes = routes(rate_limit);

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthData {
        status: "ok",
        message: "Server is running",
    })
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
