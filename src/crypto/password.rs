use argon2::Argon2;
use rand::Rng;

use crate::error::ClientError;

/// Argon2id digest of an account secret together with its per-account salt.
#[derive(Debug, Clone)]
pub struct PasswordDigest {
    pub hash: [u8; 32],
    pub salt: [u8; 32],
}

impl PasswordDigest {
    /// Derive a digest for a new account with a fresh random salt.
    pub fn derive(secret: &str) -> Result<Self, ClientError> {
        let salt: [u8; 32] = rand::thread_rng().gen();
        let hash = argon2_hash(secret, &salt)?;
        Ok(PasswordDigest { hash, salt })
    }

    /// Rebuild a digest from stored columns.
    pub fn from_stored(hash: &[u8], salt: &[u8]) -> Result<Self, ClientError> {
        let hash: [u8; 32] = hash
            .try_into()
            .map_err(|_| ClientError::Internal("Invalid stored hash".to_string()))?;
        let salt: [u8; 32] = salt
            .try_into()
            .map_err(|_| ClientError::Internal("Invalid stored salt".to_string()))?;
        Ok(PasswordDigest { hash, salt })
    }

    pub fn matches(&self, secret: &str) -> Result<bool, ClientError> {
        let candidate = argon2_hash(secret, &self.salt)?;
        // Compare every byte so timing does not leak the matching prefix.
        let diff = candidate
            .iter()
            .zip(self.hash.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        Ok(diff == 0)
    }
}

fn argon2_hash(secret: &str, salt: &[u8]) -> Result<[u8; 32], ClientError> {
    let mut hash = [0u8; 32];
    Argon2::default()
        .hash_password_into(secret.as_bytes(), salt, &mut hash)
        .map_err(|e| ClientError::Internal(format!("Password hashing failed: {}", e)))?;
    Ok(hash)
}
