//! RA-TLS certificate issuer.
//!
//! Sequences one issuance: generate the key, bind it to a quote through the
//! attestation device, build the certificate template around the quote, sign
//! it, and hand the key and certificate to the caller in parsed or raw form.
//!
//! The attestation device is shared state (the quote reflects whichever
//! report data was written last), so every entry point takes `&mut self`.
//! Callers holding several issuers over the same device must serialize them.

use ratls_core::error::Result;
use ratls_core::IssuerConfig;
use rsa::RsaPrivateKey;

use super::binding::{bind, BindOptions, Quote};
use super::channel::{AttestationDevice, DevAttestation};
use super::export::{sign, EncodedCertificate, EncodedKey, RaTlsIdentity, RawExport};
use super::keygen::{generate_keypair, KeyPolicy};
use super::template::CertificateTemplate;

/// Issues attestation-bound self-signed certificates.
#[derive(Debug)]
pub struct RaTlsIssuer<D: AttestationDevice> {
    device: D,
    config: IssuerConfig,
    policy: KeyPolicy,
}

impl RaTlsIssuer<DevAttestation> {
    /// Issuer over the pseudo-files under `config.device_root`.
    pub fn from_config(config: IssuerConfig) -> Self {
        let device = DevAttestation::new(config.device_root.clone());
        Self::with_config(device, config)
    }
}

impl<D: AttestationDevice> RaTlsIssuer<D> {
    /// Issuer with the default configuration.
    pub fn new(device: D) -> Self {
        Self::with_config(device, IssuerConfig::default())
    }

    pub fn with_config(device: D, config: IssuerConfig) -> Self {
        Self {
            device,
            config,
            policy: KeyPolicy::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Issue a new identity in parsed form.
    pub fn create_key_and_crt(&mut self) -> Result<RaTlsIdentity> {
        let (private_key, cert) = self.issue()?;
        let certificate = cert.decode()?;
        Ok(RaTlsIdentity::new(certificate, private_key))
    }

    /// Issue a new identity and copy the DER encodings into caller buffers.
    ///
    /// Each buffer receives its encoding only if the whole encoding fits;
    /// the required lengths are always reported. A buffer too small for its
    /// encoding is not an error. On error, neither buffer is touched.
    ///
    /// Every call issues a new key, and the PKCS#8 length differs by a few
    /// bytes between keys, so a key length reported by one call may be too
    /// small for the next. Size the key buffer with
    /// [`KEY_DER_MAX_LEN`](ratls_core::ratls::KEY_DER_MAX_LEN),
    /// which always fits. The certificate length depends only on the quote
    /// length. To size both buffers from one issuance, use
    /// [`issue_der`](Self::issue_der) and [`RawExport::copy`].
    pub fn create_key_and_crt_der(
        &mut self,
        key_buf: &mut [u8],
        crt_buf: &mut [u8],
    ) -> Result<RawExport> {
        let (key, cert) = self.issue_der()?;
        Ok(RawExport::copy(&key, &cert, key_buf, crt_buf))
    }

    /// Issue a new identity as exactly-sized DER encodings.
    pub fn issue_der(&mut self) -> Result<(EncodedKey, EncodedCertificate)> {
        let (private_key, cert) = self.issue()?;
        let key = EncodedKey::from_private_key(&private_key)?;
        Ok((key, cert))
    }

    fn issue(&mut self) -> Result<(RsaPrivateKey, EncodedCertificate)> {
        let private_key = generate_keypair(self.policy.bits, self.policy.exponent)?;
        let public_key = private_key.to_public_key();

        let quote = bind(&self.device, &public_key, self.bind_options())?;
        let template = CertificateTemplate::build(&public_key, &quote, &self.config.validity())?;
        let cert = sign(&template, &private_key)?;

        log_issued(&quote, &cert);
        Ok((private_key, cert))
    }

    fn bind_options(&self) -> BindOptions {
        BindOptions {
            quote_max_size: self.config.quote_max_size,
            allow_empty_quote: self.config.allow_empty_quote,
        }
    }
}

fn log_issued(quote: &Quote, cert: &EncodedCertificate) {
    tracing::info!(
        cert_size = cert.len(),
        quote_size = quote.len(),
        report_data = %quote.report_data(),
        "Issued RA-TLS certificate"
    );
}
