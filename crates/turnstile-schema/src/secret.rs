//! One-way hashing for secret fields.

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;

use turnstile_core::{PipelineError, Result};

/// Hashes a secret with Argon2id and a fresh random salt.
///
/// Called while building a change-set, so the raw secret never reaches
/// persistence. The hash is never serialized back to callers.
pub fn hash_secret(raw: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            tracing::error!(%err, "secret hashing failed");
            PipelineError::internal("secret hashing failed")
        })
}

/// Verifies a raw secret against a stored hash.
#[must_use]
pub fn verify_secret(raw: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(raw.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
