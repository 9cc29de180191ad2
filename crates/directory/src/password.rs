//! Salted password hashing primitive, part of the directory contract.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::DirectoryError;

/// Hashes a plaintext password, producing a PHC-format string suitable for
/// storage.
pub fn hash_password(plaintext: &str) -> Result<String, DirectoryError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DirectoryError::Hashing(e.to_string()))
}

/// Verifies a plaintext password against a stored PHC hash.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> Result<bool, DirectoryError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| DirectoryError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
