use actix_web::web;
use bcrypt::{hash, verify};
use validator::ValidationError;

use crate::error::AppError;

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    #[error("Failed to hash password: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Password is longer than 72 bytes")]
    TooLong,
}

/// Validator for password fields. Counts bytes, not characters.
pub fn validate_password_bytes(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        let mut err = ValidationError::new("password_too_long");
        err.message = Some(format!("Password must be at most {} bytes", MAX_PASSWORD_BYTES).into());
        return Err(err);
    }
    Ok(())
}

/// bcrypt-based password hasher. Each hash embeds its own random salt and cost,
/// so the stored string is all `verify` needs.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Refuses passwords bcrypt would truncate.
    pub fn hash(&self, password: &str) -> Result<String, HashingError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(HashingError::TooLong);
        }
        Ok(hash(password, self.cost)?)
    }

    /// Returns `false` for a wrong password. A stored value that is not a bcrypt
    /// hash, or a password too long to have been hashed, is also a mismatch.
    pub fn verify(&self, password: &str, hashed_password: &str) -> bool {
        if password.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        match verify(password, hashed_password) {
            Ok(matches) => matches,
            Err(e) => {
                log::warn!("Stored password hash could not be parsed: {}", e);
                false
            }
        }
    }

    /// Hashes on the blocking thread pool.
    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = *self;
        let hashed = web::block(move || hasher.hash(&password)).await??;
        Ok(hashed)
    }

    pub async fn verify_blocking(
        &self,
        password: String,
        hashed_password: String,
    ) -> Result<bool, AppError> {
        let hasher = *self;
        Ok(web::block(move || hasher.verify(&password, &hashed_password)).await?)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Lowest cost bcrypt accepts; keeps the tests fast.
    const TEST_COST: u32 = 4;

    #[test]
    fn test_password_hashing_and_verification() {
        let hasher = PasswordHasher::new(TEST_COST);
        let password = "test_password123";
        let hashed = hasher.hash(password).unwrap();

        assert_ne!(hashed, password);
        assert!(hasher.verify(password, &hashed));
        assert!(!hasher.verify("wrong_password", &hashed));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = PasswordHasher::new(TEST_COST);
        let first = hasher.hash("same_password").unwrap();
        let second = hasher.hash("same_password").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("same_password", &first));
        assert!(hasher.verify("same_password", &second));
    }

    #[test]
    fn test_hash_embeds_cost() {
        let hasher = PasswordHasher::new(TEST_COST);
        let hashed = hasher.hash("password123").unwrap();

        assert!(hashed.starts_with("$2"));
        assert!(hashed.contains("$04$"));
    }

    #[test]
    fn test_verify_with_invalid_hash() {
        let hasher = PasswordHasher::new(TEST_COST);
        assert!(!hasher.verify("test_password123", "invalidhashformat"));
        assert!(!hasher.verify("test_password123", "test_password123"));
    }

    #[test]
    fn test_passwords_sharing_a_long_prefix_stay_distinct() {
        let hasher = PasswordHasher::new(TEST_COST);
        let prefix = "a".repeat(MAX_PASSWORD_BYTES);
        let p = format!("{}x", prefix);
        let q = format!("{}y", prefix);

        assert!(matches!(hasher.hash(&q), Err(HashingError::TooLong)));

        let hashed_prefix = hasher.hash(&prefix).unwrap();
        assert!(hasher.verify(&prefix, &hashed_prefix));
        assert!(!hasher.verify(&p, &hashed_prefix));
        assert!(!hasher.verify(&q, &hashed_prefix));
    }

    #[test]
    fn test_password_length_is_counted_in_bytes() {
        assert!(validate_password_bytes(&"a".repeat(MAX_PASSWORD_BYTES)).is_ok());
        assert!(validate_password_bytes(&"a".repeat(MAX_PASSWORD_BYTES + 1)).is_err());
        // 37 two-byte characters: 37 chars, 74 bytes.
        assert!(validate_password_bytes(&"é".repeat(37)).is_err());
    }

    #[actix_rt::test]
    async fn test_blocking_wrappers() {
        let hasher = PasswordHasher::new(TEST_COST);
        let hashed = hasher.hash_blocking("password123".into()).await.unwrap();

        assert!(hasher
            .verify_blocking("password123".into(), hashed.clone())
            .await
            .unwrap());
        assert!(!hasher
            .verify_blocking("password124".into(), hashed)
            .await
            .unwrap());
    }
}
