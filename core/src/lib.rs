//! RA-TLS Core - Foundational Types
//!
//! Error taxonomy, issuer configuration, and the wire-level constants shared
//! by the certificate issuer and its verifiers.

pub mod config;
pub mod error;
pub mod ratls;

// Re-export commonly used types
pub use config::{IssuerConfig, Validity};
pub use error::{RaTlsError, Result};

/// RA-TLS version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
