//! Bearer-token authentication and role-based route guards.

pub mod error;
pub mod guard;
pub mod module;
pub mod password;
pub mod principal;
pub mod token;

pub use error::{AuthzError, AuthzResult};
pub use guard::{require_role, RoleGuard};
pub use module::{AuthModule, LoginRequest, LoginResponse};
pub use password::{hash_password, verify_password};
pub use principal::Principal;
pub use token::{Claims, TokenService};
