//! Argon2id password hashing.
//!
//! Hashes are PHC strings (`$argon2id$...`) with a random salt from `OsRng`,
//! so the same password never hashes to the same string twice.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{AuthzError, AuthzResult};

/// Hash a plain-text password for storage.
pub fn hash_password(password: &str) -> AuthzResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(AuthzError::Hashing)?;
    Ok(hash.to_string())
}

/// Check a plain-text password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; a malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> AuthzResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(AuthzError::Hashing)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AuthzError::Hashing(err)),
    }
}
