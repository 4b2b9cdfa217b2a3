//! Password hashing (bcrypt).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest cost bcrypt accepts. Only suitable for tests.
pub const MIN_COST: u32 = 4;

/// A stored bcrypt hash (`$2b$...`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a hash loaded from storage.
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Hashes and verifies passwords with a fixed bcrypt cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<PasswordHash, PasswordError> {
        Ok(PasswordHash(bcrypt::hash(password, self.cost)?))
    }

    /// `false` for a wrong password *and* for a corrupt stored hash; callers
    /// must not be able to tell the two apart.
    pub fn verify(&self, password: &str, hash: &PasswordHash) -> bool {
        match bcrypt::verify(password, hash.as_str()) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash could not be parsed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = PasswordHasher::new(MIN_COST);
        let hash = hasher.hash("secret123").unwrap();
        assert_ne!(hash.as_str(), "secret123");
        assert!(hasher.verify("secret123", &hash));
        assert!(!hasher.verify("secret124", &hash));
    }

    #[test]
    fn corrupt_hash_never_verifies() {
        let hasher = PasswordHasher::new(MIN_COST);
        assert!(!hasher.verify("anything", &PasswordHash::from_stored("plaintext")));
    }

    #[test]
    fn out_of_range_cost_is_an_error() {
        let hasher = PasswordHasher::new(2);
        assert!(hasher.hash("secret123").is_err());
    }
}
