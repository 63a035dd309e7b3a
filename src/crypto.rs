//! Token generation, token hashing and password hashing.
//!
//! Invite tokens and bearer tokens are high-entropy random strings, so they
//! are stored as a SHA-256 digest. Passwords go through Argon2id.

use argon2::{Algorithm, Argon2, Params, PasswordVerifier, Version};
use password_hash::{PasswordHash, PasswordHasher as _, SaltString};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::GateError;

/// Default token length in characters (~190 bits of entropy).
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// Pluggable password hashing.
pub trait PasswordHasher: Send + Sync {
    /// # Errors
    ///
    /// Returns `GateError::PasswordHashError` if hashing fails.
    fn hash(&self, password: &str) -> Result<String, GateError>;

    /// # Errors
    ///
    /// Returns `GateError::PasswordHashError` if the stored hash is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, GateError>;
}

/// Argon2id hasher with configurable cost parameters.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    /// Memory cost in KiB
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Hasher {
    #[must_use]
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// Cheapest parameters argon2 accepts. Only meant for tests.
    #[must_use]
    pub fn fast() -> Self {
        Self::new(Params::MIN_M_COST, Params::MIN_T_COST, 1)
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, GateError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|_| GateError::PasswordHashError)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|_| GateError::PasswordHashError)
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, GateError> {
        let parsed = PasswordHash::new(hash).map_err(|_| GateError::PasswordHashError)?;

        // params are read back from the encoded hash
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Generates an alphanumeric token from the OS random source.
pub fn generate_token(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn generate_token_default() -> String {
    generate_token(DEFAULT_TOKEN_LENGTH)
}

/// Hex-encoded SHA-256 of a token, used as the lookup key in storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
