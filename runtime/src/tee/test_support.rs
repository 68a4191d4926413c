//! Shared keys for unit tests. RSA-3072 generation is slow, so each test
//! binary generates these once.

use rsa::{RsaPrivateKey, RsaPublicKey};
use std::sync::OnceLock;

use super::keygen::generate_keypair;

pub(crate) fn test_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| generate_keypair(3072, 65537).expect("test key generation"))
}

pub(crate) fn test_public_key() -> &'static RsaPublicKey {
    static KEY: OnceLock<RsaPublicKey> = OnceLock::new();
    KEY.get_or_init(|| test_private_key().to_public_key())
}

pub(crate) fn other_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| generate_keypair(3072, 65537).expect("test key generation"))
}
