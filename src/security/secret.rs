//! API secret hashing and verification.
//!
//! Secrets are stored as Argon2 PHC strings. Configuration may carry either
//! a plaintext secret (hashed at seed time) or an existing `$argon2` hash.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// Verify a secret against a stored Argon2 hash.
///
/// An unparseable stored hash is an error; a mismatch is `Ok(false)`.
pub fn verify_secret(secret: &str, stored: &str) -> Result<bool, argon2::password_hash::Error> {
    let hash = PasswordHash::new(stored)?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &hash)
        .is_ok())
}

/// Hash a secret using default Argon2 settings.
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)?
        .to_string())
}

/// Whether a configured secret is already an Argon2 PHC string.
pub fn is_hashed(secret: &str) -> bool {
    secret.starts_with("$argon2")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_secret("s3cret").unwrap();
        assert!(is_hashed(&hash));
        assert!(verify_secret("s3cret", &hash).unwrap());
        assert!(!verify_secret("wrong", &hash).unwrap());
    }

    #[test]
    fn salts_differ() {
        let a = hash_secret("same").unwrap();
        let b = hash_secret("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_secret("x", "not-a-hash").is_err());
        assert!(!is_hashed("plain"));
    }
}
