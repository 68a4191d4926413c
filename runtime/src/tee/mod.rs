//! TEE attestation-bound TLS identities (RA-TLS).
//!
//! - `channel`: access to the attestation pseudo-files.
//! - `keygen`: ephemeral RSA key generation.
//! - `binding`: report data derivation and quote retrieval.
//! - `template`: certificate fields and the quote extension.
//! - `export`: signing and sized export of key and certificate.
//! - `issuer`: the issuance sequence.
//! - `verifier`: evidence extraction and rustls configuration.
//! - `simulate`: in-memory attestation source for development.

pub mod binding;
pub mod channel;
pub mod export;
pub mod issuer;
pub mod keygen;
pub mod simulate;
pub mod template;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use binding::{bind, BindOptions, Quote, ReportData};
pub use channel::{AttestationDevice, AttestationResource, DevAttestation};
pub use export::{
    copy_if_fits, EncodedCertificate, EncodedKey, RaTlsIdentity, RawExport, SizedCopy,
};
pub use issuer::RaTlsIssuer;
pub use keygen::{generate_keypair, KeyPolicy};
pub use simulate::{
    build_simulated_quote, is_simulate_mode, is_simulated_quote, SimulatedDevice,
    TEE_SIMULATE_ENV,
};
pub use template::CertificateTemplate;
pub use verifier::{
    create_client_config, create_server_config, extract_evidence, verify_self_signature,
    QuoteVerifier, RaTlsEvidence, RaTlsVerifier, ServerVerification, SimulatedQuoteVerifier,
};
