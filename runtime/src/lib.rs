//! RA-TLS Runtime - certificate issuance and verification.
//!
//! Issues self-signed X.509 certificates whose key is bound to a TEE quote
//! obtained from the attestation device, and verifies such certificates on
//! the client side of a TLS connection.

#![allow(clippy::result_large_err)]

pub mod tee;

// Re-export common types
pub use tee::{
    AttestationDevice, DevAttestation, RaTlsIdentity, RaTlsIssuer, RawExport, SimulatedDevice,
    SizedCopy,
};
pub use tee::{create_client_config, create_server_config, QuoteVerifier, ServerVerification};

/// RA-TLS Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
