use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

use crate::core::error::{AppError, Result};
use crate::shared::constants::MIN_PASSWORD_STRENGTH;
use crate::shared::validation::password_strength;

pub const MSG_MISSING_FIELDS: &str = "Please fill in all fields";
pub const MSG_PASSWORD_MISMATCH: &str = "Passwords don't match!";
pub const MSG_WEAK_PASSWORD: &str = "Please use a stronger password!";

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Confirmation must match, then the strength score must reach the minimum.
pub fn check_new_password(password: &str, confirm_password: &str) -> Result<()> {
    if password != confirm_password {
        return Err(AppError::Validation(MSG_PASSWORD_MISMATCH.to_string()));
    }
    if password_strength(password) < MIN_PASSWORD_STRENGTH {
        return Err(AppError::Validation(MSG_WEAK_PASSWORD.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Secret123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Secret123", &hash).unwrap());
        assert!(!verify_password("secret123", &hash).unwrap());
    }

    #[test]
    fn test_invalid_stored_hash_is_internal_error() {
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_mismatch_checked_before_strength() {
        let err = check_new_password("weak", "other").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == MSG_PASSWORD_MISMATCH));
    }

    #[test]
    fn test_weak_password_rejected() {
        let err = check_new_password("abcdefgh", "abcdefgh").unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == MSG_WEAK_PASSWORD));
    }

    #[test]
    fn test_strong_enough_password_accepted() {
        assert!(check_new_password("Abcdefgh", "Abcdefgh").is_ok());
        assert!(check_new_password("Abcdefg1", "Abcdefg1").is_ok());
    }
}
