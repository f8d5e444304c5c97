//! Role gate for mutating routes.
//!
//! Applied per route as middleware, independent of handler code:
//!
//! ```rust,ignore
//! let guard = RoleGuard::new(tokens, ROLE_ADMIN, "You are not authorized to create a book.");
//! Router::new().route(
//!     "/",
//!     post(create_book).layer(middleware::from_fn_with_state(guard, require_role)),
//! );
//! ```

use atlas_http::AppError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::AuthzError;
use crate::token::TokenService;

/// Required role plus the message returned to callers lacking it.
#[derive(Clone)]
pub struct RoleGuard {
    tokens: TokenService,
    role: &'static str,
    message: &'static str,
}

impl RoleGuard {
    pub fn new(tokens: TokenService, role: &'static str, message: &'static str) -> Self {
        Self {
            tokens,
            role,
            message,
        }
    }
}

/// Middleware: 401 without a valid bearer token, 403 when the caller lacks
/// the guard's role. Otherwise stores the [`crate::Principal`] in request
/// extensions and runs the handler.
pub async fn require_role(
    State(guard): State<RoleGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AuthzError::MissingCredentials)?;
    let principal = guard.tokens.verify(token)?;

    if !principal.has_role(guard.role) {
        tracing::debug!(
            email = %principal.email,
            roles = ?principal.roles,
            required = guard.role,
            "access denied: missing role"
        );
        return Err(AuthzError::Forbidden(guard.message.to_string()).into());
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Extracts the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
