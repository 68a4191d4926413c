//! Encoding and file helpers for CLI output.

use std::io::Write;
use std::path::Path;

use clap::ValueEnum;
use der::{DecodePem, Encode};
use x509_cert::Certificate;

/// On-disk encoding of certificates and keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Der,
    Pem,
}

/// Write `data` to `path`, replacing any existing file.
///
/// Private files are created with mode 0600 on Unix.
pub fn write_file(path: &Path, data: &[u8], private: bool) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if private {
            options.mode(0o600);
        }
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Read a certificate file and return its DER encoding.
pub fn read_certificate(path: &Path, format: Format) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Failed to read certificate {}: {}", path.display(), e))?;

    match format {
        Format::Der => Ok(data),
        Format::Pem => {
            let cert = Certificate::from_pem(&data)
                .map_err(|e| format!("Failed to parse PEM certificate {}: {}", path.display(), e))?;
            Ok(cert.to_der()?)
        }
    }
}

/// Format seconds since the epoch as RFC 3339 (UTC).
pub fn format_unix(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_unix() {
        assert_eq!(format_unix(978_307_200), "2001-01-01T00:00:00+00:00");
        assert_eq!(format_unix(1_924_991_999), "2030-12-31T23:59:59+00:00");
    }

    #[test]
    fn test_write_file_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.der");
        write_file(&path, &[1, 2, 3, 4], false).unwrap();
        write_file(&path, &[5], false).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![5]);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_private_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.der");
        write_file(&path, &[1], true).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_read_certificate_missing_file() {
        let result = read_certificate(Path::new("/nonexistent/cert.der"), Format::Der);
        assert!(result.is_err());
    }
}
