use thiserror::Error;

/// RA-TLS error types
#[derive(Error, Debug)]
pub enum RaTlsError {
    /// Key generation primitive failed
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// DER encoding, parsing, or signing failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Setting a certificate field failed
    #[error("Certificate field error: {field} - {message}")]
    CertificateField {
        field: &'static str,
        message: String,
    },

    /// Attestation channel open/write/read failed
    #[error("Attestation I/O error: {resource} - {message}")]
    AttestationIo { resource: String, message: String },

    /// RA-TLS certificate or quote verification failed
    #[error("Verification failed: {0}")]
    Verification(String),

    /// TLS configuration error
    #[error("TLS error: {0}")]
    Tls(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RaTlsError {
    pub fn field(field: &'static str, e: impl ToString) -> Self {
        Self::CertificateField {
            field,
            message: e.to_string(),
        }
    }

    pub fn attestation_io(resource: impl ToString, e: impl ToString) -> Self {
        Self::AttestationIo {
            resource: resource.to_string(),
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RaTlsError {
    fn from(err: serde_yaml::Error) -> Self {
        RaTlsError::Config(err.to_string())
    }
}

/// Result type alias for RA-TLS operations
pub type Result<T> = std::result::Result<T, RaTlsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation_error_display() {
        let error = RaTlsError::KeyGeneration("invalid modulus size".to_string());
        assert_eq!(error.to_string(), "Key generation failed: invalid modulus size");
    }

    #[test]
    fn test_certificate_field_error_display() {
        let error = RaTlsError::field("validity", "not_before is after not_after");
        assert_eq!(
            error.to_string(),
            "Certificate field error: validity - not_before is after not_after"
        );
    }

    #[test]
    fn test_attestation_io_error_display() {
        let error = RaTlsError::attestation_io("/dev/attestation/quote", "permission denied");
        assert_eq!(
            error.to_string(),
            "Attestation I/O error: /dev/attestation/quote - permission denied"
        );
    }

    #[test]
    fn test_encoding_error_display() {
        let error = RaTlsError::Encoding("unexpected public key DER length 294".to_string());
        assert_eq!(
            error.to_string(),
            "Encoding error: unexpected public key DER length 294"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: RaTlsError = io_error.into();
        assert!(matches!(error, RaTlsError::Io(_)));
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_yaml_error_conversion() {
        let result: std::result::Result<serde_yaml::Value, _> =
            serde_yaml::from_str("invalid: yaml: content:");
        let error: RaTlsError = result.unwrap_err().into();
        assert!(matches!(error, RaTlsError::Config(_)));
    }

    #[test]
    fn test_error_is_debug() {
        let error = RaTlsError::Verification("missing quote extension".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Verification"));
    }
}
