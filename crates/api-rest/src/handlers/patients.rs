//! Patient, vital signs, lab and progress endpoints. All require a session.

use super::to_data;
use crate::error::ApiError;
use crate::extract::{parse_id, ApiJson, ApiQuery, CurrentUser};
use crate::state::AppState;
use api_shared::ApiResponse;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sepshield_core::labs::NewLabResult;
use sepshield_core::services::patients::{PatientFilter, PatientQuery, PatientSortField};
use sepshield_core::user::Role;
use sepshield_core::{
    CoreError, Department, NewPatient, NewVitalSigns, PageRequest, PatientStatus, PatientUpdate,
    RiskLevel, RiskScore, SortSpec,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query string of `GET /api/patients`. Everything is optional and read leniently.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct PatientListParams {
    /// Active, Discharged or Critical.
    pub status: Option<String>,
    /// Low, Medium or High.
    pub risk_level: Option<String>,
    pub department: Option<String>,
    /// Case-insensitive match on name or medical record number.
    pub search: Option<String>,
    /// Field name, prefixed with `-` for descending order.
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn parse_filter<T>(
    raw: Option<&str>,
    label: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => match parse(value) {
            Some(parsed) => Ok(Some(parsed)),
            None => Err(CoreError::InvalidInput(format!("Unknown {label}: {value}")).into()),
        },
    }
}

impl PatientListParams {
    fn into_query(self) -> Result<PatientQuery, ApiError> {
        let filter = PatientFilter {
            status: parse_filter(self.status.as_deref(), "status", PatientStatus::from_name)?,
            risk_level: parse_filter(self.risk_level.as_deref(), "risk level", RiskLevel::from_name)?,
            department: parse_filter(self.department.as_deref(), "department", Department::from_name)?,
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        };

        Ok(PatientQuery {
            filter,
            sort: SortSpec::parse(
                self.sort.as_deref(),
                PatientSortField::from_name,
                PatientSortField::Name,
            ),
            page: PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref()),
        })
    }
}

/// Body of `POST /api/patients/:id/vitals`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VitalSignsReq {
    #[serde(flatten)]
    pub reading: NewVitalSigns,
    /// Stored as-is instead of the computed score when present.
    #[serde(default)]
    #[schema(value_type = Option<u8>)]
    pub risk_score: Option<RiskScore>,
}

#[utoipa::path(
    get,
    path = "/api/patients",
    params(PatientListParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "One page of patients", body = ApiResponse),
        (status = 400, description = "Unknown filter value", body = ApiResponse),
        (status = 401, description = "Not logged in", body = ApiResponse)
    )
)]
/// List patients
///
/// Filters by status, risk level and department (all exact, AND-combined) plus a free-text
/// search, then sorts and paginates.
///
/// # Returns
/// * `Json<ApiResponse>` - `data` holds the page, with `count`, `total`, `totalPages` and
///   `currentPage` alongside
///
/// # Errors
/// Returns `400 Bad Request` if a filter names an unknown status, risk level or department.
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    _user: CurrentUser,
    ApiQuery(params): ApiQuery<PatientListParams>,
) -> Result<Json<ApiResponse>, ApiError> {
    let page = state.patients.list(&params.into_query()?)?;
    Ok(Json(ApiResponse::page(
        to_data(&page.items)?,
        page.items.len(),
        page.total,
        page.total_pages,
        page.current_page as usize,
    )))
}

#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = NewPatient,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Patient created", body = ApiResponse),
        (status = 400, description = "Bad request", body = ApiResponse),
        (status = 409, description = "Medical record number already in use", body = ApiResponse)
    )
)]
/// Admit a patient
///
/// When no `assignedDoctor` is given the caller is recorded as the assigned clinician.
///
/// # Errors
/// Returns `409 Conflict` if the medical record number is already in use.
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(mut req): ApiJson<NewPatient>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    if req.assigned_doctor.is_none() {
        req.assigned_doctor = Some(user.id);
    }
    let patient = state.patients.create(req)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(to_data(&patient)?))))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Patient with latest vital signs and lab result", body = ApiResponse),
        (status = 404, description = "Patient not found", body = ApiResponse)
    )
)]
/// Get a patient
///
/// # Returns
/// * `Json<ApiResponse>` - the patient plus `latestVitalSigns` and `latestLabResult`
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let detail = state.patients.detail(&parse_id(&id)?)?;
    Ok(Json(ApiResponse::data(to_data(&detail)?)))
}

#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PatientUpdate,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Patient updated", body = ApiResponse),
        (status = 404, description = "Patient not found", body = ApiResponse),
        (status = 409, description = "Medical record number already in use", body = ApiResponse)
    )
)]
/// Update a patient
///
/// Only supplied fields change. Supplied readings are appended to the history.
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PatientUpdate>,
) -> Result<Json<ApiResponse>, ApiError> {
    let patient = state.patients.update(&parse_id(&id)?, req)?;
    Ok(Json(ApiResponse::data(to_data(&patient)?)))
}

#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Patient deleted", body = ApiResponse),
        (status = 403, description = "Caller is neither admin nor doctor", body = ApiResponse),
        (status = 404, description = "Patient not found", body = ApiResponse)
    )
)]
/// Delete a patient and all of its readings
///
/// # Errors
/// Returns `403 Forbidden` unless the caller is an admin or a doctor.
#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    user.restrict_to(&[Role::Admin, Role::Doctor])?;
    state.patients.delete(&parse_id(&id)?)?;
    Ok(Json(ApiResponse::message("Patient deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}/vitals",
    params(("id" = String, Path, description = "Patient id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Vital signs history", body = ApiResponse),
        (status = 404, description = "Patient not found", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_vital_signs(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let vitals = state.patients.vital_signs(&parse_id(&id)?)?;
    Ok(Json(ApiResponse::list(to_data(&vitals)?, vitals.len())))
}

#[utoipa::path(
    post,
    path = "/api/patients/{id}/vitals",
    params(("id" = String, Path, description = "Patient id")),
    request_body = VitalSignsReq,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reading recorded; patient rescored", body = ApiResponse),
        (status = 400, description = "Invalid reading", body = ApiResponse),
        (status = 404, description = "Patient not found", body = ApiResponse)
    )
)]
/// Record vital signs
///
/// The patient's risk score is recomputed from this reading unless `riskScore` is supplied.
#[axum::debug_handler]
pub async fn add_vital_signs(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<VitalSignsReq>,
) -> Result<Json<ApiResponse>, ApiError> {
    let patient = state
        .patients
        .add_vital_signs(&parse_id(&id)?, req.reading, req.risk_score)?;
    Ok(Json(ApiResponse::data(to_data(&patient)?)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}/labs",
    params(("id" = String, Path, description = "Patient id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Lab history", body = ApiResponse),
        (status = 404, description = "Patient not found", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_lab_results(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let labs = state.patients.lab_results(&parse_id(&id)?)?;
    Ok(Json(ApiResponse::list(to_data(&labs)?, labs.len())))
}

#[utoipa::path(
    post,
    path = "/api/patients/{id}/labs",
    params(("id" = String, Path, description = "Patient id")),
    request_body = NewLabResult,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Lab result recorded", body = ApiResponse),
        (status = 400, description = "Invalid lab result", body = ApiResponse),
        (status = 404, description = "Patient not found", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn add_lab_result(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<NewLabResult>,
) -> Result<Json<ApiResponse>, ApiError> {
    let patient = state.patients.add_lab_result(&parse_id(&id)?, req)?;
    Ok(Json(ApiResponse::data(to_data(&patient)?)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}/progress",
    params(("id" = String, Path, description = "Patient id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "SOFA / qSOFA progress points", body = ApiResponse),
        (status = 404, description = "Patient not found", body = ApiResponse)
    )
)]
/// Clinical progress
///
/// One point per early lab result, with SOFA and qSOFA scores, risk, lactate and antibiotics.
#[axum::debug_handler]
pub async fn patient_progress(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let points = state.patients.progress(&parse_id(&id)?)?;
    Ok(Json(ApiResponse::list(to_data(&points)?, points.len())))
}
