use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Authentication,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid subscription state: {0}")]
    InvalidState(String),

    #[error("Subscription period has already ended")]
    Expired,

    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Payment provider is not configured")]
    ProviderNotConfigured,

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    AuthenticationError,
    ValidationError,
    InvalidStateError,
    ExpiredError,
    ProviderError,
    PersistenceError,
    ProviderNotConfigured,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationError => "AUTHENTICATION_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidStateError => "INVALID_STATE_ERROR",
            ErrorCode::ExpiredError => "EXPIRED_ERROR",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::PersistenceError => "PERSISTENCE_ERROR",
            ErrorCode::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
