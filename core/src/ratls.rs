//! Wire-level constants of the RA-TLS certificate format.
//!
//! A verifier parses certificates produced by the issuer using only these
//! values: the quote extension OID, the fixed subject name, and the size of
//! the report data bound into the quote.

/// OID of the X.509 extension carrying the raw SGX quote.
pub const QUOTE_EXTENSION_OID: &str = "1.2.840.113741.1337.6";

/// Subject and issuer name of every RA-TLS certificate.
pub const CERT_SUBJECT_NAME: &str = "CN=RATLS,O=GrapheneDevelopers,C=US";

/// Serial number of every RA-TLS certificate.
pub const CERT_SERIAL_NUMBER: u8 = 1;

/// Default start of the validity window (`YYYYMMDDhhmmss`, UTC).
pub const CERT_TIMESTAMP_NOT_BEFORE: &str = "20010101000000";

/// Default end of the validity window (`YYYYMMDDhhmmss`, UTC).
pub const CERT_TIMESTAMP_NOT_AFTER: &str = "20301231235959";

/// Size of the report data digest written to the attestation source.
pub const REPORT_DATA_SIZE: usize = 32;

/// Upper bound on the quote read back from the attestation source.
pub const QUOTE_MAX_SIZE: usize = 8192;

/// Largest quote ceiling a configuration may request (1 MiB).
pub const QUOTE_SIZE_LIMIT: usize = 1 << 20;

/// RSA modulus size of the certificate key.
pub const RSA_KEY_BITS: usize = 3072;

/// RSA public exponent of the certificate key.
pub const RSA_PUBLIC_EXPONENT: u64 = 65537;

/// DER length of a SubjectPublicKeyInfo for an RSA-3072 key with e = 65537.
pub const RSA_3072_SPKI_DER_LEN: usize = 422;

/// Upper bound on the PKCS#8 DER length of an RSA-3072 private key.
///
/// The exact length varies by a few bytes between keys because the private
/// exponent and CRT values have no leading-zero padding. The bound assumes
/// every integer at its maximum width: a 385-byte modulus and private
/// exponent, and 193-byte primes and CRT values.
pub const KEY_DER_MAX_LEN: usize = 1796;

/// Default directory exposing the attestation pseudo-files.
pub const DEFAULT_DEVICE_ROOT: &str = "/dev/attestation";

/// Split a dotted OID into its arcs.
pub fn oid_arcs(oid: &str) -> Vec<u64> {
    oid.split('.')
        .filter_map(|s| s.parse::<u64>().ok())
        .collect()
}
