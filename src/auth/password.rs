//! Password hashing and verification.
//!
//! New passwords are stored as Argon2id PHC strings. Seed data written by hand into the
//! document store may still hold plaintext; those records are compared in constant time.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use subtle::ConstantTimeEq;

use crate::errors::{AppError, AppResult};

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a plaintext password against the stored value.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if is_phc_hash(stored) {
        return match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {}", e);
                false
            }
        };
    }
    constant_time_compare(password, stored)
}

fn is_phc_hash(stored: &str) -> bool {
    stored.starts_with("$argon2")
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash));
        assert!(!verify_password("secret2", &hash));
    }

    #[test]
    fn test_plaintext_seed_records() {
        assert!(verify_password("p", "p"));
        assert!(!verify_password("wrong", "p"));
        assert!(!verify_password("", "p"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("$argon2id$garbage", "$argon2id$garbage"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
        assert!(constant_time_compare("", ""));
    }
}
