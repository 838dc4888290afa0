use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcademyError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// The payment provider could not be reached or rejected the call.
    #[error("Payment provider error: {0}")]
    ProviderError(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl AcademyError {
    /// Stable machine-readable code sent to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AcademyError::ValidationError(_) => "ValidationError",
            AcademyError::Unauthorized(_) => "Unauthorized",
            AcademyError::Forbidden(_) => "Forbidden",
            AcademyError::NotFound(_) => "NotFound",
            AcademyError::Conflict(_) => "Conflict",
            AcademyError::ProviderError(_) => "ProviderError",
            AcademyError::InternalError(_) => "ServerError",
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AcademyError::InternalError(message.into().into())
    }
}

impl From<serde_json::Error> for AcademyError {
    fn from(err: serde_json::Error) -> Self {
        AcademyError::InternalError(Box::new(err))
    }
}

impl From<std::io::Error> for AcademyError {
    fn from(err: std::io::Error) -> Self {
        AcademyError::InternalError(Box::new(err))
    }
}

impl From<jsonwebtoken::errors::Error> for AcademyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AcademyError::InternalError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for AcademyError {
    fn from(err: rocksdb::Error) -> Self {
        AcademyError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, AcademyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_display() {
        let err = AcademyError::internal("column family missing");
        assert_eq!(err.to_string(), "Internal error: column family missing");
        assert_eq!(err.code(), "ServerError");
    }

    #[test]
    fn test_provider_error_code() {
        let err = AcademyError::ProviderError("timeout".to_string());
        assert_eq!(err.code(), "ProviderError");
        assert!(err.to_string().contains("timeout"));
    }
}
