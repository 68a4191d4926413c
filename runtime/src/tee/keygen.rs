//! Ephemeral RSA key generation for RA-TLS certificates.

use rand::rngs::OsRng;
use ratls_core::error::{RaTlsError, Result};
use ratls_core::ratls::{RSA_KEY_BITS, RSA_PUBLIC_EXPONENT};
use rsa::{BigUint, RsaPrivateKey};

/// Size and exponent of the certificate key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPolicy {
    pub bits: usize,
    pub exponent: u64,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            bits: RSA_KEY_BITS,
            exponent: RSA_PUBLIC_EXPONENT,
        }
    }
}

/// Generate a fresh RSA keypair with the given modulus size and exponent.
pub fn generate_keypair(bits: usize, exponent: u64) -> Result<RsaPrivateKey> {
    let exp = BigUint::from(exponent);
    let key = RsaPrivateKey::new_with_exp(&mut OsRng, bits, &exp).map_err(|e| {
        RaTlsError::KeyGeneration(format!("Failed to generate RSA-{} key pair: {}", bits, e))
    })?;

    tracing::debug!(bits, exponent, "Generated RA-TLS key pair");
    Ok(key)
}
