//! Password hashing.

use argon2::password_hash::{PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use tallypay_accounts::PasswordHash;
use tallypay_core::{WalletError, WalletResult};

/// Turns passwords into opaque hashes and checks them later.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> WalletResult<PasswordHash>;

    /// False for a wrong password and for a hash this hasher cannot read.
    fn verify(&self, password: &str, hash: &PasswordHash) -> bool;
}

/// Argon2id hasher producing PHC strings (`$argon2id$v=19$...`).
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Argon2id with the crate's recommended parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Argon2id with explicit cost parameters (KiB of memory, passes, lanes).
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> WalletResult<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| WalletError::internal(format!("argon2 params: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> WalletResult<PasswordHash> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)
            .map_err(|e| WalletError::internal(format!("salt encoding: {e}")))?;

        let phc = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| WalletError::internal(format!("password hashing: {e}")))?;

        Ok(PasswordHash::new(phc.to_string()))
    }

    fn verify(&self, password: &str, hash: &PasswordHash) -> bool {
        match PhcString::new(hash.as_str()) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Hasher {
        Argon2Hasher::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn correct_password_verifies() {
        let hasher = cheap();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("battery staple", &hash));
    }

    #[test]
    fn same_password_hashes_differently() {
        let hasher = cheap();
        assert_ne!(hasher.hash("pw").unwrap(), hasher.hash("pw").unwrap());
    }

    #[test]
    fn unreadable_hash_never_verifies() {
        assert!(!cheap().verify("pw", &PasswordHash::new("not-a-phc-string")));
    }
}
