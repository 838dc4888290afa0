use super::AppState;
use crate::application::auth::Caller;
use crate::domain::user::Role;
use crate::error::AcademyError;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::{async_trait, extract::FromRequest};

/// `axum::Json` whose rejections render as `ValidationError`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AcademyError))]
pub struct ApiJson<T>(pub T);

/// `Path` with the same error rendering; a malformed id is a 400.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AcademyError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AcademyError))]
pub struct ApiQuery<T>(pub T);

fn unauthorized() -> AcademyError {
    AcademyError::Unauthorized("Unauthorized".to_string())
}

/// `Ok(None)` when no `Authorization` header was sent at all; a header that
/// is present but not a bearer token is an error.
fn bearer_token(parts: &Parts) -> Result<Option<String>, AcademyError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| Some(token.to_string()))
        .ok_or_else(unauthorized)
}

/// A request carrying a valid access token for an existing account.
pub struct AuthUser(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AcademyError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or_else(unauthorized)?;
        Ok(Self(state.auth.authenticate(&token).await?))
    }
}

/// Like [`AuthUser`], but anonymous requests are let through as `None`.
/// A token that is sent and fails to verify is still rejected.
pub struct MaybeAuthUser(pub Option<Caller>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AcademyError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Self(Some(state.auth.authenticate(&token).await?))),
            None => Ok(Self(None)),
        }
    }
}

pub struct AdminUser(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AcademyError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(caller) = AuthUser::from_request_parts(parts, state).await?;
        match caller.role {
            Role::Admin => Ok(Self(caller)),
            Role::Applicant | Role::Student => {
                Err(AcademyError::Forbidden("Forbidden".to_string()))
            }
        }
    }
}
