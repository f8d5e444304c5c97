//! The authenticated caller.

use atlas_http::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Identity and roles of the caller, placed in request extensions by the
/// role guard once a bearer token has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
    pub roles: Vec<String>,
}

impl Principal {
    /// Returns `true` if the principal holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("authentication required"))
    }
}
