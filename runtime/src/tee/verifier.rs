//! RA-TLS certificate verification and TLS configuration.
//!
//! A peer presenting an RA-TLS certificate is accepted when:
//! 1. the certificate is self-signed by its own subject key,
//! 2. it carries the quote extension, and
//! 3. the injected [`QuoteVerifier`] accepts the quote for the report data
//!    recomputed from the subject key.
//!
//! Quote validation itself (signature chains, TCB status, measurements) is
//! the job of the injected verifier.

use std::fmt::Debug;
use std::sync::Arc;

use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};
use ratls_core::error::{RaTlsError, Result};
use ratls_core::ratls::{QUOTE_EXTENSION_OID, REPORT_DATA_SIZE};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use sha2::Sha256;
use x509_cert::Certificate;

use super::binding::ReportData;
use super::export::RaTlsIdentity;
use super::simulate::{is_simulated_quote, simulated_quote_report_data};

/// sha256WithRSAEncryption
const SHA256_WITH_RSA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");

/// Evidence carried by an RA-TLS certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaTlsEvidence {
    /// Raw quote from the certificate extension.
    pub quote: Vec<u8>,
    /// DER-encoded SubjectPublicKeyInfo of the certificate key.
    pub subject_public_key_der: Vec<u8>,
    /// Report data the quote must carry for this key.
    pub report_data: ReportData,
}

impl RaTlsEvidence {
    pub fn is_simulated(&self) -> bool {
        is_simulated_quote(&self.quote)
    }
}

fn parse_certificate(cert_der: &[u8]) -> Result<Certificate> {
    Certificate::from_der(cert_der)
        .map_err(|e| RaTlsError::Verification(format!("Failed to parse RA-TLS certificate: {}", e)))
}

/// Extract the quote and the key binding from an RA-TLS certificate.
pub fn extract_evidence(cert_der: &[u8]) -> Result<RaTlsEvidence> {
    let cert = parse_certificate(cert_der)?;

    let quote_oid = ObjectIdentifier::new(QUOTE_EXTENSION_OID).map_err(|e| {
        RaTlsError::Verification(format!("Invalid quote extension OID: {}", e))
    })?;

    let quote = cert
        .tbs_certificate
        .extensions
        .as_ref()
        .and_then(|exts| exts.iter().find(|ext| ext.extn_id == quote_oid))
        .map(|ext| ext.extn_value.as_bytes().to_vec())
        .ok_or_else(|| {
            RaTlsError::Verification(
                "RA-TLS certificate does not contain the quote extension".to_string(),
            )
        })?;

    let subject_public_key_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| RaTlsError::Verification(format!("Failed to encode subject key: {}", e)))?;
    let report_data = ReportData::from_spki_der(&subject_public_key_der);

    Ok(RaTlsEvidence {
        quote,
        subject_public_key_der,
        report_data,
    })
}

/// Check that the certificate is signed by its own subject key.
pub fn verify_self_signature(cert_der: &[u8]) -> Result<()> {
    let cert = parse_certificate(cert_der)?;
    let tbs = &cert.tbs_certificate;

    if tbs.issuer != tbs.subject {
        return Err(RaTlsError::Verification(format!(
            "Certificate is not self-issued: issuer '{}', subject '{}'",
            tbs.issuer, tbs.subject
        )));
    }

    if cert.signature_algorithm.oid != SHA256_WITH_RSA_OID {
        return Err(RaTlsError::Verification(format!(
            "Unsupported signature algorithm {}",
            cert.signature_algorithm.oid
        )));
    }

    let spki_der = tbs
        .subject_public_key_info
        .to_der()
        .map_err(|e| RaTlsError::Verification(format!("Failed to encode subject key: {}", e)))?;
    let public_key = RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| RaTlsError::Verification(format!("Subject key is not RSA: {}", e)))?;

    let signature = Signature::try_from(cert.signature.raw_bytes())
        .map_err(|e| RaTlsError::Verification(format!("Malformed signature: {}", e)))?;
    let tbs_der = tbs
        .to_der()
        .map_err(|e| RaTlsError::Verification(format!("Failed to encode TBS certificate: {}", e)))?;

    VerifyingKey::<Sha256>::new(public_key)
        .verify(&tbs_der, &signature)
        .map_err(|e| RaTlsError::Verification(format!("Self-signature check failed: {}", e)))
}

/// Quote validation capability.
pub trait QuoteVerifier: Send + Sync + Debug {
    /// Accept or reject `evidence.quote` as proof for `evidence.report_data`.
    fn verify_quote(&self, evidence: &RaTlsEvidence) -> Result<()>;
}

/// Accepts simulated quotes that carry the certificate's report data.
///
/// Only for development: simulated quotes carry no hardware signature.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedQuoteVerifier;

impl QuoteVerifier for SimulatedQuoteVerifier {
    fn verify_quote(&self, evidence: &RaTlsEvidence) -> Result<()> {
        let report_data = simulated_quote_report_data(&evidence.quote).ok_or_else(|| {
            RaTlsError::Verification("Quote is not a simulated quote".to_string())
        })?;

        if &report_data[..REPORT_DATA_SIZE] != evidence.report_data.as_bytes() {
            return Err(RaTlsError::Verification(
                "Quote report data does not match the certificate key".to_string(),
            ));
        }

        tracing::warn!("Accepting simulated quote (not hardware-attested)");
        Ok(())
    }
}

/// How a client authenticates the server certificate.
#[derive(Debug, Clone)]
pub enum ServerVerification {
    /// RA-TLS: self-signed certificate plus quote verification.
    Attested(Arc<dyn QuoteVerifier>),
    /// Ordinary WebPKI chain validation against a root store.
    WebPki(Arc<RootCertStore>),
}

fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn tls_error(context: &str, e: rustls::Error) -> RaTlsError {
    RaTlsError::Tls(format!("{}: {}", context, e))
}

/// Create a rustls `ServerConfig` presenting `identity`.
pub fn create_server_config(identity: &RaTlsIdentity) -> Result<rustls::ServerConfig> {
    let cert = CertificateDer::from(identity.certificate_der()?);
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        identity.private_key_der()?.as_der().to_vec(),
    ));

    rustls::ServerConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error("Failed to select protocol versions", e))?
        .with_no_client_auth()
        .with_single_cert(vec![cert], key)
        .map_err(|e| tls_error("Failed to create RA-TLS server config", e))
}

/// Create a rustls `ClientConfig` using the given server verification.
pub fn create_client_config(verification: ServerVerification) -> Result<rustls::ClientConfig> {
    let provider = crypto_provider();
    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error("Failed to select protocol versions", e))?;

    let config = match verification {
        ServerVerification::Attested(quote_verifier) => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(RaTlsVerifier::new(
                quote_verifier,
                &provider,
            )))
            .with_no_client_auth(),
        ServerVerification::WebPki(roots) => {
            builder.with_root_certificates(roots).with_no_client_auth()
        }
    };

    Ok(config)
}

/// rustls certificate verifier for RA-TLS servers.
#[derive(Debug)]
pub struct RaTlsVerifier {
    quote_verifier: Arc<dyn QuoteVerifier>,
    algorithms: WebPkiSupportedAlgorithms,
}

impl RaTlsVerifier {
    pub fn new(quote_verifier: Arc<dyn QuoteVerifier>, provider: &CryptoProvider) -> Self {
        Self {
            quote_verifier,
            algorithms: provider.signature_verification_algorithms,
        }
    }

    /// Verify an RA-TLS certificate at time `now` (seconds since the epoch).
    pub fn verify_certificate(&self, cert_der: &[u8], now: u64) -> Result<RaTlsEvidence> {
        verify_self_signature(cert_der)?;
        check_validity(cert_der, now)?;

        let evidence = extract_evidence(cert_der)?;
        self.quote_verifier.verify_quote(&evidence)?;

        tracing::debug!(
            report_data = %evidence.report_data,
            quote_size = evidence.quote.len(),
            simulated = evidence.is_simulated(),
            "RA-TLS certificate verified"
        );
        Ok(evidence)
    }
}

fn check_validity(cert_der: &[u8], now: u64) -> Result<()> {
    let cert = parse_certificate(cert_der)?;
    let validity = &cert.tbs_certificate.validity;
    let not_before = validity.not_before.to_unix_duration().as_secs();
    let not_after = validity.not_after.to_unix_duration().as_secs();

    if now < not_before || now > not_after {
        return Err(RaTlsError::Verification(format!(
            "Certificate not valid at {} (window {}..{})",
            now, not_before, not_after
        )));
    }
    Ok(())
}

impl ServerCertVerifier for RaTlsVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        self.verify_certificate(end_entity.as_ref(), now.as_secs())
            .map_err(|e| rustls::Error::General(format!("RA-TLS verification failed: {}", e)))?;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}
