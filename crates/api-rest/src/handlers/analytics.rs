//! Dashboard aggregations over the whole patient collection. All require a session.

use super::to_data;
use crate::error::ApiError;
use crate::extract::{ApiQuery, CurrentUser};
use crate::state::AppState;
use api_shared::ApiResponse;
use axum::extract::State;
use axum::Json;
use chrono::{Datelike, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthlyParams {
    /// Calendar year; the current year when omitted.
    pub year: Option<i32>,
}

#[utoipa::path(
    get,
    path = "/api/analytics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Totals, detection rate, outcomes and risk levels", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
/// General analytics
#[axum::debug_handler]
pub async fn summary(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse>, ApiError> {
    let summary = state.analytics.summary()?;
    Ok(Json(ApiResponse::data(to_data(&summary)?)))
}

#[utoipa::path(
    get,
    path = "/api/analytics/monthly",
    params(MonthlyParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Twelve monthly admission counts", body = ApiResponse),
        (status = 400, description = "Year out of range", body = ApiResponse)
    )
)]
/// Admissions per month
///
/// Always twelve entries, January first, zero-filled.
#[axum::debug_handler]
pub async fn monthly_cases(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiQuery(params): ApiQuery<MonthlyParams>,
) -> Result<Json<ApiResponse>, ApiError> {
    let year = params.year.unwrap_or_else(|| Utc::now().year());
    let months = state.analytics.monthly_cases(year)?;
    Ok(Json(ApiResponse::data(to_data(&months)?)))
}

#[utoipa::path(
    get,
    path = "/api/analytics/departments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Patients per department, busiest first", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn department_cases(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse>, ApiError> {
    let departments = state.analytics.department_cases()?;
    Ok(Json(ApiResponse::data(to_data(&departments)?)))
}

#[utoipa::path(
    get,
    path = "/api/analytics/risk-distribution",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Patients per risk level", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn risk_distribution(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse>, ApiError> {
    let buckets = state.analytics.risk_distribution()?;
    Ok(Json(ApiResponse::data(to_data(&buckets)?)))
}

#[utoipa::path(
    get,
    path = "/api/analytics/detection-rate",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Early detection against total cases", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn detection_rate(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse>, ApiError> {
    let rate = state.analytics.detection_rate()?;
    Ok(Json(ApiResponse::data(to_data(&rate)?)))
}

#[utoipa::path(
    get,
    path = "/api/analytics/outcomes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Recovered, under treatment and critical counts", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn patient_outcomes(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse>, ApiError> {
    let outcomes = state.analytics.patient_outcomes()?;
    Ok(Json(ApiResponse::data(to_data(&outcomes)?)))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Headline dashboard figures", body = ApiResponse)
    )
)]
/// Dashboard headline stats
///
/// Active patients and sepsis alerts with their week-on-week and same-day changes, predicted
/// outcomes, average risk score and per-department counts.
#[axum::debug_handler]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<ApiResponse>, ApiError> {
    let stats = state.analytics.dashboard_stats(Utc::now())?;
    Ok(Json(ApiResponse::data(to_data(&stats)?)))
}
