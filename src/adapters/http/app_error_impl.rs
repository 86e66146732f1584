use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            AppError::Authentication => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::AuthenticationError, None)
            }
            AppError::Validation(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, Some(msg))
            }
            AppError::InvalidState(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidStateError, Some(msg))
            }
            AppError::Expired => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::ExpiredError, None)
            }
            AppError::Provider(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::ProviderError, Some(msg))
            }
            // 400, not 500: Stripe redelivers webhooks on any non-2xx, and
            // callers treat all persistence trouble as a retryable request
            // failure. Details stay in the log.
            AppError::Database(_) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::PersistenceError, None)
            }
            AppError::ProviderNotConfigured => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ProviderNotConfigured,
                None,
            ),
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                None,
            ),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
