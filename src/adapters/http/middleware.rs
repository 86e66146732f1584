use axum::http::{HeaderMap, header::AUTHORIZATION};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::jwt,
    infra::config::AppConfig,
};

/// Resolve the authenticated user from a `Bearer` token.
pub fn current_user(headers: &HeaderMap, config: &AppConfig) -> AppResult<Uuid> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::Authentication)?;

    jwt::verify(token, &config.jwt_secret)
}
