//! Doctor directory. Reads are public; changes are admin only.

use super::to_data;
use crate::error::ApiError;
use crate::extract::{parse_id, ApiJson, ApiQuery, CurrentUser};
use crate::state::AppState;
use api_shared::ApiResponse;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sepshield_core::doctor::{DoctorUpdate, NewDoctor};
use sepshield_core::services::doctors::{DoctorQuery, DoctorSortField};
use sepshield_core::user::Role;
use sepshield_core::{PageRequest, SortSpec};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DoctorListParams {
    /// Exact specialty, ignoring case.
    pub specialty: Option<String>,
    /// Field name, prefixed with `-` for descending order.
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl From<DoctorListParams> for DoctorQuery {
    fn from(params: DoctorListParams) -> Self {
        DoctorQuery {
            specialty: params.specialty,
            sort: SortSpec::parse(
                params.sort.as_deref(),
                DoctorSortField::from_name,
                DoctorSortField::Name,
            ),
            page: PageRequest::from_raw(params.page.as_deref(), params.limit.as_deref()),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/doctors",
    params(DoctorListParams),
    responses(
        (status = 200, description = "One page of doctor profiles", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DoctorListParams>,
) -> Result<Json<ApiResponse>, ApiError> {
    let page = state.doctors.list(&params.into())?;
    Ok(Json(ApiResponse::page(
        to_data(&page.items)?,
        page.items.len(),
        page.total,
        page.total_pages,
        page.current_page as usize,
    )))
}

#[utoipa::path(
    get,
    path = "/api/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    responses(
        (status = 200, description = "Doctor profile", body = ApiResponse),
        (status = 404, description = "Doctor not found", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let doctor = state.doctors.get(&parse_id(&id)?)?;
    Ok(Json(ApiResponse::data(to_data(&doctor)?)))
}

#[utoipa::path(
    post,
    path = "/api/doctors",
    request_body = NewDoctor,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Doctor profile created", body = ApiResponse),
        (status = 403, description = "Caller is not an admin", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<NewDoctor>,
) -> Result<(StatusCode, Json<ApiResponse>), ApiError> {
    user.restrict_to(&[Role::Admin])?;
    let doctor = state.doctors.create(req)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(to_data(&doctor)?))))
}

#[utoipa::path(
    put,
    path = "/api/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    request_body = DoctorUpdate,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Doctor profile updated", body = ApiResponse),
        (status = 403, description = "Caller is not an admin", body = ApiResponse),
        (status = 404, description = "Doctor not found", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<DoctorUpdate>,
) -> Result<Json<ApiResponse>, ApiError> {
    user.restrict_to(&[Role::Admin])?;
    let doctor = state.doctors.update(&parse_id(&id)?, req)?;
    Ok(Json(ApiResponse::data(to_data(&doctor)?)))
}

#[utoipa::path(
    delete,
    path = "/api/doctors/{id}",
    params(("id" = String, Path, description = "Doctor id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Doctor profile deleted", body = ApiResponse),
        (status = 403, description = "Caller is not an admin", body = ApiResponse),
        (status = 404, description = "Doctor not found", body = ApiResponse)
    )
)]
#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    user.restrict_to(&[Role::Admin])?;
    state.doctors.delete(&parse_id(&id)?)?;
    Ok(Json(ApiResponse::message("Doctor deleted successfully")))
}
