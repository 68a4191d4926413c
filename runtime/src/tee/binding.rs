//! Binding a certificate key to an attestation quote.
//!
//! The report data submitted to the attestation source is the SHA-256 digest
//! of the DER-encoded SubjectPublicKeyInfo of the certificate key. The quote
//! returned for it therefore vouches for exactly that key.

use ratls_core::error::{RaTlsError, Result};
use ratls_core::ratls::{QUOTE_MAX_SIZE, REPORT_DATA_SIZE, RSA_3072_SPKI_DER_LEN};
use rsa::pkcs8::EncodePublicKey;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};

use super::channel::{read_resource, write_resource, AttestationDevice, AttestationResource};

/// SHA-256 digest of a DER-encoded SubjectPublicKeyInfo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportData([u8; REPORT_DATA_SIZE]);

impl ReportData {
    /// Compute the report data for an RSA public key.
    ///
    /// Only the RSA-3072 encoding is accepted; any other length means the
    /// key does not match the issuance policy.
    pub fn from_public_key(public_key: &RsaPublicKey) -> Result<Self> {
        let spki = public_key.to_public_key_der().map_err(|e| {
            RaTlsError::Encoding(format!("Failed to DER-encode public key: {}", e))
        })?;

        if spki.as_bytes().len() != RSA_3072_SPKI_DER_LEN {
            return Err(RaTlsError::Encoding(format!(
                "Unexpected public key DER length {} (expected {})",
                spki.as_bytes().len(),
                RSA_3072_SPKI_DER_LEN
            )));
        }

        Ok(Self::from_spki_der(spki.as_bytes()))
    }

    /// Digest of an already encoded SubjectPublicKeyInfo.
    pub fn from_spki_der(spki_der: &[u8]) -> Self {
        Self(Sha256::digest(spki_der).into())
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_DATA_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ReportData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Opaque quote returned by the attestation source for a given report data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    bytes: Vec<u8>,
    report_data: ReportData,
}

impl Quote {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Report data this quote was requested for.
    pub fn report_data(&self) -> &ReportData {
        &self.report_data
    }

    #[cfg(test)]
    pub(crate) fn from_parts(bytes: Vec<u8>, report_data: ReportData) -> Self {
        Self { bytes, report_data }
    }
}

/// Limits applied when reading the quote back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOptions {
    pub quote_max_size: usize,
    pub allow_empty_quote: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            quote_max_size: QUOTE_MAX_SIZE,
            allow_empty_quote: false,
        }
    }
}

/// Obtain a quote bound to `public_key` from the attestation source.
///
/// Writes the report data to the input resource, then reads the quote from
/// the output resource. Not safe to run concurrently against the same
/// source: the quote reflects whichever report data was written last.
pub fn bind<D: AttestationDevice + ?Sized>(
    device: &D,
    public_key: &RsaPublicKey,
    options: BindOptions,
) -> Result<Quote> {
    let report_data = ReportData::from_public_key(public_key)?;

    let input = AttestationResource::ReportInput;
    let written = write_resource(device, input, report_data.as_bytes())
        .map_err(|e| RaTlsError::attestation_io(device.locate(input), e))?;
    if written != REPORT_DATA_SIZE {
        return Err(RaTlsError::attestation_io(
            device.locate(input),
            format!("accepted {} of {} report data bytes", written, REPORT_DATA_SIZE),
        ));
    }

    let output = AttestationResource::QuoteOutput;
    let bytes = read_resource(device, output, options.quote_max_size)
        .map_err(|e| RaTlsError::attestation_io(device.locate(output), e))?;
    if bytes.is_empty() && !options.allow_empty_quote {
        return Err(RaTlsError::attestation_io(
            device.locate(output),
            "attestation source returned an empty quote",
        ));
    }

    tracing::debug!(
        report_data = %report_data,
        quote_size = bytes.len(),
        "Obtained quote for RA-TLS key"
    );

    Ok(Quote { bytes, report_data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tee::keygen::generate_keypair;
    use crate::tee::simulate::SimulatedDevice;
    use crate::tee::test_support::test_public_key as test_key;
    use std::io;

    /// Device whose quote resource always fails.
    struct BrokenQuoteDevice;

    impl AttestationDevice for BrokenQuoteDevice {
        fn open(
            &self,
            resource: AttestationResource,
        ) -> io::Result<Box<dyn crate::tee::channel::ChannelHandle + '_>> {
            match resource {
                AttestationResource::ReportInput => Ok(Box::new(io::Cursor::new(Vec::new()))),
                AttestationResource::QuoteOutput => {
                    Err(io::Error::new(io::ErrorKind::Other, "quote generation failed"))
                }
            }
        }
    }

    /// Device whose report data resource accepts only a few bytes.
    struct ShortInputDevice;

    impl AttestationDevice for ShortInputDevice {
        fn open(
            &self,
            _resource: AttestationResource,
        ) -> io::Result<Box<dyn crate::tee::channel::ChannelHandle + '_>> {
            Ok(Box::new(io::Cursor::new([0u8; 16])))
        }
    }

    #[test]
    fn test_report_data_is_sha256_of_spki() {
        let key = test_key();
        let spki = key.to_public_key_der().unwrap();
        assert_eq!(spki.as_bytes().len(), RSA_3072_SPKI_DER_LEN);

        let expected: [u8; 32] = Sha256::digest(spki.as_bytes()).into();
        let report_data = ReportData::from_public_key(key).unwrap();
        assert_eq!(report_data.as_bytes(), &expected);
    }

    #[test]
    fn test_report_data_is_deterministic() {
        let a = ReportData::from_public_key(test_key()).unwrap();
        let b = ReportData::from_public_key(test_key()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn test_report_data_rejects_other_key_sizes() {
        let key = generate_keypair(2048, 65537).unwrap().to_public_key();
        let result = ReportData::from_public_key(&key);
        assert!(matches!(result, Err(RaTlsError::Encoding(_))));
    }

    #[test]
    fn test_bind_writes_report_data_and_reads_quote() {
        let device = SimulatedDevice::with_fixed_quote(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let quote = bind(&device, test_key(), BindOptions::default()).unwrap();

        let expected = ReportData::from_public_key(test_key()).unwrap();
        assert_eq!(device.last_report_data().unwrap(), expected.as_bytes().to_vec());
        assert_eq!(quote.as_bytes(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(quote.report_data(), &expected);
    }

    #[test]
    fn test_bind_truncates_at_quote_max_size() {
        let device = SimulatedDevice::with_fixed_quote(vec![0x11; 100]);
        let options = BindOptions {
            quote_max_size: 64,
            ..Default::default()
        };
        let quote = bind(&device, test_key(), options).unwrap();
        assert_eq!(quote.len(), 64);
    }

    #[test]
    fn test_bind_rejects_empty_quote_by_default() {
        let device = SimulatedDevice::with_fixed_quote(Vec::new());
        let result = bind(&device, test_key(), BindOptions::default());
        assert!(matches!(result, Err(RaTlsError::AttestationIo { .. })));
    }

    #[test]
    fn test_bind_allows_empty_quote_when_configured() {
        let device = SimulatedDevice::with_fixed_quote(Vec::new());
        let options = BindOptions {
            allow_empty_quote: true,
            ..Default::default()
        };
        let quote = bind(&device, test_key(), options).unwrap();
        assert!(quote.is_empty());
    }

    #[test]
    fn test_bind_quote_read_error() {
        let result = bind(&BrokenQuoteDevice, test_key(), BindOptions::default());
        match result {
            Err(RaTlsError::AttestationIo { resource, message }) => {
                assert_eq!(resource, "quote-output");
                assert!(message.contains("quote generation failed"));
            }
            other => panic!("expected AttestationIo, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_short_report_data_write() {
        let result = bind(&ShortInputDevice, test_key(), BindOptions::default());
        match result {
            Err(RaTlsError::AttestationIo { resource, message }) => {
                assert_eq!(resource, "report-input");
                assert!(message.contains("16 of 32"));
            }
            other => panic!("expected AttestationIo, got {:?}", other),
        }
    }
}
