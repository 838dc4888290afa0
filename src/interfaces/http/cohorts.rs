use super::{AdminUser, ApiJson, ApiPath, ApiQuery, AppState, AuthUser};
use crate::application::cohorts::{CohortDetail, CohortFilter, NewCohort};
use crate::domain::cohort::{Cohort, CohortChanges};
use crate::error::Result;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use uuid::Uuid;

pub async fn create(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(body): ApiJson<NewCohort>,
) -> Result<(StatusCode, Json<Cohort>)> {
    let cohort = state.cohorts.create(body).await?;
    Ok((StatusCode::CREATED, Json(cohort)))
}

/// Open to any signed-in account.
pub async fn list(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    ApiQuery(filter): ApiQuery<CohortFilter>,
) -> Result<Json<Vec<Cohort>>> {
    Ok(Json(state.cohorts.list(&filter).await?))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CohortDetail>> {
    Ok(Json(state.cohorts.get(id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CohortChanges>,
) -> Result<Json<Cohort>> {
    Ok(Json(state.cohorts.update(id, body).await?))
}
