//! RA-TLS CLI - issue and inspect attestation-bound certificates.

pub mod commands;
pub mod output;
