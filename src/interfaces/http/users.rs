use super::{ApiJson, AppState, AuthUser};
use crate::application::auth::Me;
use crate::domain::user::UserChanges;
use crate::error::Result;
use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordBody {
    #[serde(default)]
    current_password: Option<String>,
    new_password: String,
}

pub async fn me(State(state): State<AppState>, AuthUser(caller): AuthUser) -> Result<Json<Me>> {
    Ok(Json(state.auth.me(caller.id).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(body): ApiJson<UserChanges>,
) -> Result<Json<Value>> {
    let user = state.auth.update_me(caller.id, body).await?;
    Ok(Json(json!({ "user": user })))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(body): ApiJson<PasswordBody>,
) -> Result<Json<Value>> {
    state
        .auth
        .change_password(caller.id, body.current_password, body.new_password)
        .await?;
    Ok(Json(json!({ "ok": true })))
}
