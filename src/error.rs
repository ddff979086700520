use crate::domain::profile::CalcError;
use crate::services::ai::AiError;
use crate::web::ENDPOINTS;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Every failure a handler can report. Each variant renders as
/// `{ "success": false, "error": ... }` with its own status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("AI service not available. Check the API key configuration.")]
    ServiceUnavailable,
    #[error("Invalid AI service credentials")]
    Auth(String),
    #[error("AI service quota exceeded. Please try again later.")]
    QuotaExceeded(String),
    #[error("{message}")]
    Internal { message: &'static str, details: String },
    #[error("Endpoint not found")]
    NotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn details(&self) -> Option<&str> {
        match self {
            Self::Auth(details) | Self::QuotaExceeded(details) => Some(details),
            Self::Internal { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}: {}", self, self.details().unwrap_or("-"));
        }

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });
        if let Some(details) = self.details() {
            body["details"] = json!(details);
        }
        if matches!(self, Self::NotFound) {
            body["availableEndpoints"] = json!(ENDPOINTS);
        }
        (status, Json(body)).into_response()
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Auth(details) => Self::Auth(details),
            AiError::Quota(details) => Self::QuotaExceeded(details),
            other => Self::Internal {
                message: "Failed to analyze food image",
                details: other.to_string(),
            },
        }
    }
}

impl From<CalcError> for ApiError {
    fn from(err: CalcError) -> Self {
        match err {
            CalcError::NonFinite(_) => Self::Internal {
                message: "Calculation error",
                details: err.to_string(),
            },
            other => Self::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::ServiceUnavailable.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Auth("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::QuotaExceeded("x".into()).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_ai_errors_map_to_api_errors() {
        assert!(matches!(ApiError::from(AiError::Auth("bad key".into())), ApiError::Auth(_)));
        assert!(matches!(ApiError::from(AiError::Quota("quota".into())), ApiError::QuotaExceeded(_)));
        assert!(matches!(ApiError::from(AiError::Timeout(std::time::Duration::from_secs(30))), ApiError::Internal { .. }));
    }

    #[test]
    fn test_calc_errors_map_to_api_errors() {
        let missing = ApiError::from(CalcError::MissingFields(vec!["age"]));
        assert_eq!(missing.to_string(), "Missing required fields: age");
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        let non_finite = ApiError::from(CalcError::NonFinite("bmr"));
        assert_eq!(non_finite.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
