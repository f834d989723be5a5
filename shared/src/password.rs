//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings, so parameters travel with each hash
//! and verification works across parameter changes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid Argon2 parameters: {0}")]
    Params(String),

    #[error("failed to hash password: {0}")]
    Hash(String),
}

pub struct CredentialHasher {
    argon2: Argon2<'static>,
    /// Hash of a throwaway password, verified against when the account does
    /// not exist so that both failure paths do the same work.
    dummy_hash: String,
}

impl CredentialHasher {
    /// Argon2id with the library defaults (m=19 MiB, t=2, p=1).
    pub fn new() -> Result<Self, CredentialError> {
        Self::with_params(Params::default())
    }

    pub fn with_params(params: Params) -> Result<Self, CredentialError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "not-a-real-password")?;
        Ok(Self { argon2, dummy_hash })
    }

    /// Cheapest valid parameters. Only meant for tests.
    pub fn insecure_for_tests() -> Result<Self, CredentialError> {
        let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
            .map_err(|e| CredentialError::Params(e.to_string()))?;
        Self::with_params(params)
    }

    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        hash_with(&self.argon2, password)
    }

    /// Check `password` against a stored hash.
    ///
    /// `None` means there is no such account. The dummy hash is verified in
    /// its place and the result discarded, so callers cannot tell the cases
    /// apart by timing. A stored hash that does not parse never matches.
    pub fn verify(&self, password: &str, stored: Option<&str>) -> bool {
        let (hash, exists) = match stored {
            Some(hash) => (hash, true),
            None => (self.dummy_hash.as_str(), false),
        };

        let matched = match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::error!("Stored password hash is malformed: {}", e);
                false
            }
        };

        exists && matched
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}
