use super::{ApiJson, AppState};
use crate::application::auth::{Registration, Session};
use crate::error::Result;
use crate::infrastructure::tokens::TokenPair;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetConfirmBody {
    token: String,
    new_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutBody {
    #[serde(default)]
    refresh_token: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Registration>,
) -> Result<(StatusCode, Json<Session>)> {
    let session = state.auth.register(body).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginBody>,
) -> Result<Json<TokenPair>> {
    Ok(Json(state.auth.login(&body.email, body.password).await?))
}

pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshBody>,
) -> Result<Json<TokenPair>> {
    Ok(Json(state.auth.refresh(&body.refresh_token).await?))
}

/// Always succeeds; a malformed body is treated as an empty one.
pub async fn logout(State(state): State<AppState>, body: Option<Json<LogoutBody>>) -> Json<Value> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    state.auth.logout(body.refresh_token.as_deref()).await;
    Json(json!({ "ok": true }))
}

/// Answers the same way whether or not the account exists.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetRequestBody>,
) -> Result<Json<Value>> {
    state.auth.request_password_reset(&body.email).await?;
    Ok(Json(json!({ "message": "Password reset email sent" })))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetConfirmBody>,
) -> Result<Json<Value>> {
    state
        .auth
        .confirm_password_reset(&body.token, body.new_password)
        .await?;
    Ok(Json(json!({ "message": "Password successfully reset" })))
}
