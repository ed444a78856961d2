//! Password hashing with salted PBKDF2-HMAC-SHA256.
//!
//! Hashes are self-describing strings of the form
//! `pbkdf2:sha256:<iterations>$<salt-hex>$<hash-hex>`, so the iteration count
//! can be raised later without invalidating stored hashes.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::constants::{HASH_LENGTH, PBKDF2_ITERATIONS, SALT_LENGTH};
use crate::error::SharedError;

const METHOD_PREFIX: &str = "pbkdf2:sha256:";

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(PBKDF2_ITERATIONS)
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, SharedError> {
        if password.is_empty() {
            return Err(SharedError::EmptyPassword);
        }

        let mut salt = [0u8; SALT_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut salt);

        let derived = derive(password, &salt, self.iterations);
        Ok(format!(
            "{METHOD_PREFIX}{}${}${}",
            self.iterations,
            hex::encode(salt),
            hex::encode(derived)
        ))
    }

    /// Check a password against a stored hash string.
    ///
    /// Malformed hashes and empty passwords never verify.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        if password.is_empty() {
            return false;
        }
        let Some((iterations, salt, expected)) = decode(encoded) else {
            return false;
        };

        let derived = derive(password, &salt, iterations);
        derived.len() == expected.len() && derived[..].ct_eq(&expected[..]).unwrap_u8() == 1
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn decode(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let rest = encoded.strip_prefix(METHOD_PREFIX)?;
    let mut parts = rest.splitn(3, '$');
    let iterations: u32 = parts.next()?.parse().ok()?;
    let salt = hex::decode(parts.next()?).ok()?;
    let hash = hex::decode(parts.next()?).ok()?;
    if iterations == 0 || salt.is_empty() || hash.is_empty() {
        return None;
    }
    Some((iterations, salt, hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordHasher {
        PasswordHasher::new(1_000)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast();
        let stored = hasher.hash("doctor123").unwrap();
        assert!(stored.starts_with("pbkdf2:sha256:1000$"));
        assert!(hasher.verify("doctor123", &stored));
        assert!(!hasher.verify("doctor124", &stored));
    }

    #[test]
    fn test_salt_is_random() {
        let hasher = fast();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_uses_stored_iterations() {
        let stored = PasswordHasher::new(500).hash("secret").unwrap();
        assert!(PasswordHasher::new(2_000).verify("secret", &stored));
    }

    #[test]
    fn test_empty_password() {
        let hasher = fast();
        assert_eq!(hasher.hash(""), Err(SharedError::EmptyPassword));
        let stored = hasher.hash("x").unwrap();
        assert!(!hasher.verify("", &stored));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let hasher = fast();
        assert!(!hasher.verify("x", ""));
        assert!(!hasher.verify("x", "plaintext"));
        assert!(!hasher.verify("x", "pbkdf2:sha256:abc$00$00"));
        assert!(!hasher.verify("x", "pbkdf2:sha256:10$zz$00"));
    }
}
