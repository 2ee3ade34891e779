//! HTTP surface: routing, CORS and error mapping around the forecast service.

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use stockcast_core::domain::forecast::ForecastResult;
use stockcast_core::domain::request::ForecastPayload;
use stockcast_core::error::ForecastError;
use stockcast_core::service::ForecastService;

#[derive(Clone)]
pub struct AppState {
    pub service: ForecastService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/prophetize", post(prophetize))
        .route("/forecast", post(prophetize))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Any origin when unset or `*`, otherwise the comma separated list.
pub fn cors_layer(origins: Option<&str>) -> anyhow::Result<CorsLayer> {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let origins: Vec<&str> = origins
        .map(|s| s.split(',').map(str::trim).filter(|o| !o.is_empty()).collect())
        .unwrap_or_default();
    if origins.is_empty() || origins.contains(&"*") {
        return Ok(base.allow_origin(Any));
    }

    let values = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin: {o}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(base.allow_origin(AllowOrigin::list(values)))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn prophetize(
    State(state): State<AppState>,
    payload: Result<Json<ForecastPayload>, JsonRejection>,
) -> Result<Json<ForecastResult>, ApiError> {
    let requested_at = Utc::now();
    let Json(payload) = payload?;

    let request = payload.resolve(requested_at)?;
    let result = state.service.produce_forecast(request, requested_at).await?;
    Ok(Json(result))
}

#[derive(Debug)]
pub enum ApiError {
    Body(JsonRejection),
    Forecast(ForecastError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        ApiError::Forecast(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

fn status_for(err: &ForecastError) -> StatusCode {
    match err {
        ForecastError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ForecastError::DataUnavailable { .. } => StatusCode::NOT_FOUND,
        ForecastError::InsufficientHistory { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ForecastError::FitFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Body(rejection) => (rejection.status(), "invalid_request", rejection.body_text()),
            ApiError::Forecast(err) => {
                let status = status_for(&err);
                let kind = err.kind();
                let message = err.to_string();
                if err.is_client_error() {
                    tracing::info!(kind, %message, "forecast rejected");
                } else {
                    let err = anyhow::Error::new(err);
                    sentry_anyhow::capture_anyhow(&err);
                    tracing::error!(error = %err, "forecast failed");
                }
                (status, kind, message)
            }
        };

        (
            status,
            Json(ErrorBody {
                error: ErrorDetail { kind, message },
            }),
        )
            .into_response()
    }
}
