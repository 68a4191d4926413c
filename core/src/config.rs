use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RaTlsError, Result};
use crate::ratls::{
    CERT_TIMESTAMP_NOT_AFTER, CERT_TIMESTAMP_NOT_BEFORE, DEFAULT_DEVICE_ROOT, QUOTE_MAX_SIZE,
    QUOTE_SIZE_LIMIT,
};

/// Environment variable overriding the start of the validity window.
pub const ENV_CERT_NOT_BEFORE: &str = "RA_TLS_CERT_TIMESTAMP_NOT_BEFORE";

/// Environment variable overriding the end of the validity window.
pub const ENV_CERT_NOT_AFTER: &str = "RA_TLS_CERT_TIMESTAMP_NOT_AFTER";

/// Environment variable overriding the attestation device root.
pub const ENV_DEVICE_ROOT: &str = "RA_TLS_DEVICE_ROOT";

/// Format of the validity timestamps (`YYYYMMDDhhmmss`).
const CERT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Issuer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IssuerConfig {
    /// Start of the certificate validity window (`YYYYMMDDhhmmss`)
    pub certificate_not_before: Option<String>,

    /// End of the certificate validity window (`YYYYMMDDhhmmss`)
    pub certificate_not_after: Option<String>,

    /// Directory exposing the `user_report_data` and `quote` resources
    pub device_root: PathBuf,

    /// Maximum number of quote bytes read from the attestation source
    pub quote_max_size: usize,

    /// Embed a zero-length quote instead of failing the issuance
    pub allow_empty_quote: bool,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            certificate_not_before: None,
            certificate_not_after: None,
            device_root: PathBuf::from(DEFAULT_DEVICE_ROOT),
            quote_max_size: QUOTE_MAX_SIZE,
            allow_empty_quote: false,
        }
    }
}

impl IssuerConfig {
    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load a YAML configuration file. Environment overrides are not applied.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            RaTlsError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&data)?;
        if config.quote_max_size == 0 {
            return Err(RaTlsError::Config(
                "quote-max-size must be greater than zero".to_string(),
            ));
        }
        if config.quote_max_size > QUOTE_SIZE_LIMIT {
            return Err(RaTlsError::Config(format!(
                "quote-max-size {} exceeds the limit of {} bytes",
                config.quote_max_size, QUOTE_SIZE_LIMIT
            )));
        }
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment-style keys).
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_CERT_NOT_BEFORE) {
            self.certificate_not_before = Some(v);
        }
        if let Some(v) = lookup(ENV_CERT_NOT_AFTER) {
            self.certificate_not_after = Some(v);
        }
        if let Some(v) = lookup(ENV_DEVICE_ROOT) {
            self.device_root = PathBuf::from(v);
        }
        self
    }

    /// Resolve the validity window.
    ///
    /// Each bound falls back to its default independently when it is
    /// missing or not a valid 14-digit timestamp.
    pub fn validity(&self) -> Validity {
        Validity {
            not_before: resolve_timestamp(
                "certificate-not-before",
                self.certificate_not_before.as_deref(),
                CERT_TIMESTAMP_NOT_BEFORE,
            ),
            not_after: resolve_timestamp(
                "certificate-not-after",
                self.certificate_not_after.as_deref(),
                CERT_TIMESTAMP_NOT_AFTER,
            ),
        }
    }
}

/// Certificate validity window (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: NaiveDateTime,
    pub not_after: NaiveDateTime,
}

impl Default for Validity {
    fn default() -> Self {
        IssuerConfig::default().validity()
    }
}

/// Parse a `YYYYMMDDhhmmss` timestamp.
pub fn parse_cert_timestamp(value: &str) -> Option<NaiveDateTime> {
    if value.len() != 14 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(value, CERT_TIMESTAMP_FORMAT).ok()
}

fn resolve_timestamp(name: &str, value: Option<&str>, default: &str) -> NaiveDateTime {
    if let Some(v) = value {
        match parse_cert_timestamp(v) {
            Some(ts) => return ts,
            None => {
                tracing::warn!(option = name, value = v, "Invalid certificate timestamp, using default");
            }
        }
    }
    // The defaults are compile-time constants in the accepted format.
    parse_cert_timestamp(default).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = IssuerConfig::default();
        assert_eq!(config.device_root, PathBuf::from("/dev/attestation"));
        assert_eq!(config.quote_max_size, 8192);
        assert!(!config.allow_empty_quote);
        assert!(config.certificate_not_before.is_none());
    }

    #[test]
    fn test_default_validity() {
        let validity = IssuerConfig::default().validity();
        assert_eq!(
            validity.not_before,
            NaiveDate::from_ymd_opt(2001, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(
            validity.not_after,
            NaiveDate::from_ymd_opt(2030, 12, 31)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap()
        );
    }

    #[test]
    fn test_parse_cert_timestamp() {
        let ts = parse_cert_timestamp("20240229123456").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(ts.hour(), 12);
        assert_eq!(ts.minute(), 34);
        assert_eq!(ts.second(), 56);
    }

    #[test]
    fn test_parse_cert_timestamp_rejects_malformed() {
        assert!(parse_cert_timestamp("").is_none());
        assert!(parse_cert_timestamp("2024").is_none());
        assert!(parse_cert_timestamp("2024-01-01T00:00").is_none());
        assert!(parse_cert_timestamp("20241301000000").is_none());
        assert!(parse_cert_timestamp("202401010000001").is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = IssuerConfig::default().with_overrides_from(lookup(&[
            (ENV_CERT_NOT_BEFORE, "20200101000000"),
            (ENV_CERT_NOT_AFTER, "20211231235959"),
            (ENV_DEVICE_ROOT, "/tmp/attestation"),
        ]));
        assert_eq!(config.certificate_not_before.as_deref(), Some("20200101000000"));
        assert_eq!(config.device_root, PathBuf::from("/tmp/attestation"));

        let validity = config.validity();
        assert_eq!(validity.not_before.date(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(validity.not_after.date(), NaiveDate::from_ymd_opt(2021, 12, 31).unwrap());
    }

    #[test]
    fn test_malformed_timestamp_falls_back_independently() {
        let config = IssuerConfig::default().with_overrides_from(lookup(&[
            (ENV_CERT_NOT_BEFORE, "yesterday"),
            (ENV_CERT_NOT_AFTER, "20251231000000"),
        ]));
        let validity = config.validity();
        assert_eq!(validity.not_before, Validity::default().not_before);
        assert_eq!(validity.not_after.date(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn test_no_overrides_leaves_config_untouched() {
        let config = IssuerConfig::default().with_overrides_from(lookup(&[]));
        assert_eq!(config, IssuerConfig::default());
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issuer.yaml");
        std::fs::write(
            &path,
            "certificate-not-before: \"20220101000000\"\n\
             device-root: /run/attestation\n\
             allow-empty-quote: true\n",
        )
        .unwrap();

        let config = IssuerConfig::load(&path).unwrap();
        assert_eq!(config.certificate_not_before.as_deref(), Some("20220101000000"));
        assert!(config.certificate_not_after.is_none());
        assert_eq!(config.device_root, PathBuf::from("/run/attestation"));
        assert_eq!(config.quote_max_size, 8192);
        assert!(config.allow_empty_quote);
    }

    #[test]
    fn test_load_rejects_zero_quote_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issuer.yaml");
        std::fs::write(&path, "quote-max-size: 0\n").unwrap();
        let result = IssuerConfig::load(&path);
        assert!(matches!(result, Err(RaTlsError::Config(_))));
    }

    #[test]
    fn test_load_rejects_oversized_quote_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issuer.yaml");
        std::fs::write(&path, "quote-max-size: 18446744073709551615\n").unwrap();
        match IssuerConfig::load(&path) {
            Err(RaTlsError::Config(msg)) => assert!(msg.contains("exceeds the limit")),
            other => panic!("expected Config error, got {:?}", other),
        }

        std::fs::write(&path, format!("quote-max-size: {}\n", QUOTE_SIZE_LIMIT)).unwrap();
        assert_eq!(IssuerConfig::load(&path).unwrap().quote_max_size, QUOTE_SIZE_LIMIT);
    }

    #[test]
    fn test_load_missing_file() {
        let result = IssuerConfig::load(Path::new("/nonexistent/issuer.yaml"));
        assert!(matches!(result, Err(RaTlsError::Config(_))));
    }
}
