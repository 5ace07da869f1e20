//! Password hashing via bcrypt, and the one strength policy every call site
//! uses (signup, reset, password change, admin creation).

use thiserror::Error;
use tracing::debug;

use super::AuthError;

/// bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Lowest cost bcrypt accepts; used by tests to keep hashing fast.
pub const MIN_BCRYPT_COST: u32 = 4;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Strength policy violations, reported first-found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    #[error("Password is required")]
    Missing,

    #[error("Password must be at least {0} characters long")]
    TooShort(usize),

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one number")]
    MissingDigit,
}

/// Check `password` against the strength policy.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Missing);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort(MIN_PASSWORD_LENGTH));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(PasswordError::MissingLowercase);
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(PasswordError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::MissingDigit);
    }
    Ok(())
}

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash_password_with_cost(password, DEFAULT_BCRYPT_COST)
}

/// Hash a password with an explicit bcrypt cost.
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash. A malformed hash is a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            debug!(error = %e, "bcrypt verify failed on malformed hash");
            false
        }
    }
}

/// Hash compared against when no account matched. Built at the same cost as
/// real credentials so a miss takes as long as a wrong password.
pub(crate) fn timing_equalizer_hash(cost: u32) -> Result<String, AuthError> {
    hash_password_with_cost("storefront-timing-equalizer", cost)
}

/// Burn one bcrypt verification against `equalizer`.
pub(crate) fn equalize_timing(password: &str, equalizer: &str) {
    let _ = verify_password(password, equalizer);
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = MIN_BCRYPT_COST;

    #[test]
    fn accepts_a_policy_compliant_password() {
        assert_eq!(validate_password("Abc12345"), Ok(()));
    }

    #[test]
    fn reports_first_violation() {
        assert_eq!(validate_password(""), Err(PasswordError::Missing));
        assert_eq!(validate_password("Ab1"), Err(PasswordError::TooShort(8)));
        assert_eq!(validate_password("ABCDEFG1"), Err(PasswordError::MissingLowercase));
        assert_eq!(validate_password("abcdefg1"), Err(PasswordError::MissingUppercase));
        assert_eq!(validate_password("Abcdefgh"), Err(PasswordError::MissingDigit));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 7 characters, more than 8 bytes.
        assert_eq!(validate_password("Ébc123é"), Err(PasswordError::TooShort(8)));
    }

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password_with_cost("Abc12345", TEST_COST).unwrap();
        assert!(verify_password("Abc12345", &hash));
        assert!(!verify_password("Abc12346", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password_with_cost("Abc12345", TEST_COST).unwrap();
        let b = hash_password_with_cost("Abc12345", TEST_COST).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("Abc12345", &a));
        assert!(verify_password("Abc12345", &b));
    }

    #[test]
    fn minimum_cost_is_accepted_by_bcrypt() {
        let hash = hash_password_with_cost("Abc12345", MIN_BCRYPT_COST).unwrap();
        assert!(hash.starts_with("$2b$04$"));
        assert!(hash_password_with_cost("Abc12345", MIN_BCRYPT_COST - 1).is_err());
    }

    #[test]
    fn equalizer_hash_follows_configured_cost() {
        let fast = timing_equalizer_hash(MIN_BCRYPT_COST).unwrap();
        let slower = timing_equalizer_hash(MIN_BCRYPT_COST + 1).unwrap();
        assert!(fast.starts_with("$2b$04$"));
        assert!(slower.starts_with("$2b$05$"));
        assert!(!verify_password("Abc12345", &fast));
    }

    #[test]
    fn malformed_hash_is_a_mismatch_not_an_error() {
        assert!(!verify_password("Abc12345", "not-a-bcrypt-hash"));
        assert!(!verify_password("Abc12345", ""));
    }
}
