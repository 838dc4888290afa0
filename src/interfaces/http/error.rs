use crate::error::AcademyError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

impl AcademyError {
    pub fn status(&self) -> StatusCode {
        match self {
            AcademyError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AcademyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AcademyError::Forbidden(_) => StatusCode::FORBIDDEN,
            AcademyError::NotFound(_) => StatusCode::NOT_FOUND,
            AcademyError::Conflict(_) => StatusCode::CONFLICT,
            AcademyError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            AcademyError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AcademyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AcademyError::InternalError(source) => {
                error!(error = %source, "request failed");
                "Internal server error".to_string()
            }
            AcademyError::ProviderError(_) => {
                error!(error = %self, "payment provider failed");
                self.to_string()
            }
            other => other.to_string(),
        };
        let body = json!({ "error": { "code": self.code(), "message": message } });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AcademyError {
    fn from(rejection: JsonRejection) -> Self {
        AcademyError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AcademyError {
    fn from(rejection: PathRejection) -> Self {
        AcademyError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AcademyError {
    fn from(rejection: QueryRejection) -> Self {
        AcademyError::ValidationError(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AcademyError::ValidationError("x".into()), 400),
            (AcademyError::Unauthorized("x".into()), 401),
            (AcademyError::Forbidden("x".into()), 403),
            (AcademyError::NotFound("x".into()), 404),
            (AcademyError::Conflict("x".into()), 409),
            (AcademyError::ProviderError("x".into()), 502),
            (AcademyError::internal("x"), 500),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status().as_u16(), expected);
        }
    }
}
