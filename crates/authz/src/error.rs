//! Authentication and authorization errors.

use atlas_db::DbError;
use atlas_http::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("missing bearer token")]
    MissingCredentials,

    #[error("invalid or expired token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("password hashing failed: {0}")]
    Hashing(argon2::password_hash::Error),

    #[error(transparent)]
    Storage(#[from] DbError),
}

pub type AuthzResult<T> = Result<T, AuthzError>;

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::MissingCredentials | AuthzError::InvalidToken(_) => {
                AppError::unauthorized("a valid bearer token is required")
            }
            AuthzError::InvalidCredentials => AppError::unauthorized("invalid credentials"),
            AuthzError::Forbidden(message) => AppError::forbidden(message),
            AuthzError::Storage(db) => AppError::from(db),
            AuthzError::Hashing(_) => AppError::Internal(anyhow::anyhow!(err.to_string())),
        }
    }
}
