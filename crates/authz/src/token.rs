//! HS256 bearer tokens.

use std::sync::Arc;

use atlas_db::User;
use atlas_kernel::settings::AuthSettings;
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::error::AuthzResult;
use crate::principal::Principal;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User email.
    pub sub: String,
    pub roles: Vec<String>,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and verifies access tokens. Cheap to clone.
#[derive(Clone)]
pub struct TokenService {
    inner: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                validation: Validation::new(Algorithm::HS256),
                ttl_secs,
            }),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.jwt_secret.as_bytes(), settings.token_ttl_secs)
    }

    pub fn ttl_secs(&self) -> u64 {
        self.inner.ttl_secs
    }

    /// Sign a token for `user` valid for the configured TTL.
    pub fn issue(&self, user: &User) -> AuthzResult<String> {
        self.issue_for(&user.email, user.roles())
    }

    /// Sign a token for an arbitrary subject and role set.
    pub fn issue_for(&self, email: &str, roles: Vec<String>) -> AuthzResult<String> {
        let now = get_current_timestamp();
        let claims = Claims {
            sub: email.to_string(),
            roles,
            iat: now,
            exp: now + self.inner.ttl_secs,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.inner.encoding,
        )?)
    }

    /// Check signature and expiry, returning the caller.
    pub fn verify(&self, token: &str) -> AuthzResult<Principal> {
        let data = decode::<Claims>(token, &self.inner.decoding, &self.inner.validation)?;
        Ok(Principal {
            email: data.claims.sub,
            roles: data.claims.roles,
        })
    }
}
