use super::{AdminUser, ApiJson, ApiPath, AppState};
use crate::application::cohorts::{Student, StudentChanges};
use crate::error::Result;
use axum::Json;
use axum::extract::State;
use uuid::Uuid;

pub async fn update(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StudentChanges>,
) -> Result<Json<Student>> {
    Ok(Json(state.cohorts.update_student(user_id, body).await?))
}
