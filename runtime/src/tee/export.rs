//! Signing the certificate template and exporting the key pair.
//!
//! Raw exports into caller-provided buffers follow a two-phase sizing rule:
//! the required length is always reported, and bytes are copied only when the
//! whole encoding fits. A buffer is never partially written.

use der::pem::LineEnding;
use der::{Decode, Encode, EncodePem};
use ratls_core::error::{RaTlsError, Result};
use rsa::pkcs8::{EncodePrivateKey, SecretDocument};
use rsa::RsaPrivateKey;
use x509_cert::Certificate;

use super::template::CertificateTemplate;

/// Outcome of copying an encoding into a caller buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizedCopy {
    /// Length of the full encoding.
    pub required_len: usize,
    /// Bytes copied: either 0 or `required_len`.
    pub written: usize,
}

impl SizedCopy {
    /// Whether the encoding was copied.
    pub fn is_complete(&self) -> bool {
        self.written == self.required_len
    }
}

/// Copy `encoded` into the front of `out` if it fits entirely.
pub fn copy_if_fits(encoded: &[u8], out: &mut [u8]) -> SizedCopy {
    let required_len = encoded.len();
    if out.len() < required_len {
        return SizedCopy {
            required_len,
            written: 0,
        };
    }
    out[..required_len].copy_from_slice(encoded);
    SizedCopy {
        required_len,
        written: required_len,
    }
}

/// Result of a raw key and certificate export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawExport {
    pub key: SizedCopy,
    pub certificate: SizedCopy,
}

impl RawExport {
    /// Copy `key` and `cert` into caller buffers, each under the
    /// copy-if-fits rule.
    pub fn copy(
        key: &EncodedKey,
        cert: &EncodedCertificate,
        key_buf: &mut [u8],
        crt_buf: &mut [u8],
    ) -> Self {
        Self {
            key: copy_if_fits(key.as_der(), key_buf),
            certificate: copy_if_fits(cert.as_der(), crt_buf),
        }
    }

    /// Whether both encodings were copied.
    pub fn is_complete(&self) -> bool {
        self.key.is_complete() && self.certificate.is_complete()
    }
}

/// DER encoding of a signed RA-TLS certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCertificate(Vec<u8>);

impl EncodedCertificate {
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    pub fn into_der(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the encoding back into a certificate.
    pub fn decode(&self) -> Result<Certificate> {
        Certificate::from_der(&self.0)
            .map_err(|e| RaTlsError::Encoding(format!("Failed to parse certificate: {}", e)))
    }

    pub fn to_pem(&self) -> Result<String> {
        self.decode()?
            .to_pem(LineEnding::LF)
            .map_err(|e| RaTlsError::Encoding(format!("Failed to PEM-encode certificate: {}", e)))
    }
}

/// PKCS#8 DER encoding of the certificate private key. Zeroized on drop.
pub struct EncodedKey(SecretDocument);

impl EncodedKey {
    /// Encode `private_key` as PKCS#8.
    pub fn from_private_key(private_key: &RsaPrivateKey) -> Result<Self> {
        private_key
            .to_pkcs8_der()
            .map(Self)
            .map_err(|e| RaTlsError::Encoding(format!("Failed to DER-encode private key: {}", e)))
    }

    pub fn as_der(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_bytes().is_empty()
    }

    pub fn to_pem(&self) -> Result<String> {
        self.0
            .to_pem("PRIVATE KEY", LineEnding::LF)
            .map(|pem| pem.as_str().to_string())
            .map_err(|e| RaTlsError::Encoding(format!("Failed to PEM-encode private key: {}", e)))
    }
}

impl std::fmt::Debug for EncodedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedKey")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Parsed RA-TLS identity: the certificate and its private key.
pub struct RaTlsIdentity {
    certificate: Certificate,
    private_key: RsaPrivateKey,
}

impl RaTlsIdentity {
    pub fn new(certificate: Certificate, private_key: RsaPrivateKey) -> Self {
        Self {
            certificate,
            private_key,
        }
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Re-encode the certificate as DER.
    pub fn certificate_der(&self) -> Result<Vec<u8>> {
        self.certificate
            .to_der()
            .map_err(|e| RaTlsError::Encoding(format!("Failed to DER-encode certificate: {}", e)))
    }

    pub fn private_key_der(&self) -> Result<EncodedKey> {
        EncodedKey::from_private_key(&self.private_key)
    }

    /// TLS server configuration presenting this identity.
    pub fn server_config(&self) -> Result<rustls::ServerConfig> {
        super::verifier::create_server_config(self)
    }
}

impl std::fmt::Debug for RaTlsIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaTlsIdentity")
            .field("serial", &self.certificate.tbs_certificate.serial_number)
            .field("subject", &self.certificate.tbs_certificate.subject.to_string())
            .finish_non_exhaustive()
    }
}

/// Sign `template` with `private_key`, producing the self-signed certificate.
///
/// The signing key must be the key the template's quote is bound to.
/// The signature is RSA PKCS#1 v1.5 over SHA-256.
pub fn sign(template: &CertificateTemplate, private_key: &RsaPrivateKey) -> Result<EncodedCertificate> {
    if &private_key.to_public_key() != template.subject_key() {
        return Err(RaTlsError::Encoding(
            "Signing key does not match the certificate key".to_string(),
        ));
    }

    let pkcs8 = EncodedKey::from_private_key(private_key)?;
    let key_pair = rcgen::KeyPair::try_from(pkcs8.as_der()).map_err(|e| {
        RaTlsError::Encoding(format!("Failed to load signing key: {}", e))
    })?;

    let cert = template.params().clone().self_signed(&key_pair).map_err(|e| {
        RaTlsError::Encoding(format!("Failed to sign RA-TLS certificate: {}", e))
    })?;

    Ok(EncodedCertificate(cert.der().to_vec()))
}
