//! # rw-auth-argon2
//!
//! Argon2-based implementation of `PasswordHasher`.
//! Hashes are stored as PHC strings, so parameters and salt travel with them.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use rw_core::traits::PasswordHasher;

#[derive(Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Random 16-byte salt from the OS.
    fn fresh_salt() -> anyhow::Result<SaltString> {
        let mut bytes = [0u8; 16];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow::anyhow!("os randomness unavailable: {e}"))?;
        SaltString::encode_b64(&bytes).map_err(|e| anyhow::anyhow!("encode salt: {e}"))
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = Self::fresh_salt()?;
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("argon2: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
