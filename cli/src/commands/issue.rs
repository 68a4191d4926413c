//! `ratls issue` command: issue a key and an RA-TLS certificate.
//!
//! Writes report data for a fresh RSA-3072 key to the attestation device,
//! embeds the returned quote in a self-signed certificate, and writes the
//! certificate and PKCS#8 private key to disk.

use std::path::{Path, PathBuf};

use clap::Args;
use ratls_runtime::tee::{extract_evidence, is_simulate_mode};
use ratls_runtime::{RaTlsIssuer, SimulatedDevice};

use crate::output::{write_file, Format};

#[derive(Args)]
pub struct IssueArgs {
    /// Output path of the certificate
    #[arg(long)]
    pub cert: PathBuf,

    /// Output path of the private key (created with mode 0600)
    #[arg(long)]
    pub key: PathBuf,

    /// Output encoding
    #[arg(long, value_enum, default_value_t = Format::Der)]
    pub format: Format,

    /// Issuer configuration file (YAML)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory exposing the attestation pseudo-files
    #[arg(long)]
    pub device_root: Option<PathBuf>,

    /// Use the in-memory simulated attestation source (also RA_TLS_SIMULATE=1)
    #[arg(long)]
    pub simulate: bool,
}

/// JSON output for the issue command.
#[derive(serde::Serialize)]
struct IssueOutput {
    certificate: PathBuf,
    private_key: PathBuf,
    format: Format,
    certificate_size: usize,
    quote_size: usize,
    report_data: String,
    simulated: bool,
}

pub fn execute(args: IssueArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(args.config.as_deref())?;
    if let Some(root) = args.device_root {
        config.device_root = root;
    }

    let simulated = args.simulate || is_simulate_mode();
    let (key, cert) = if simulated {
        tracing::warn!("Issuing with a simulated attestation source (not hardware-attested)");
        RaTlsIssuer::with_config(SimulatedDevice::new(), config).issue_der()?
    } else {
        let mut issuer = RaTlsIssuer::from_config(config);
        if !issuer.device().is_available() {
            return Err(format!(
                "Attestation device not found at {} (use --simulate outside a TEE)",
                issuer.device().root().display()
            )
            .into());
        }
        issuer.issue_der()?
    };

    let evidence = extract_evidence(cert.as_der())?;

    match args.format {
        Format::Der => write_pair(&args.key, key.as_der(), &args.cert, cert.as_der())?,
        Format::Pem => {
            let cert_pem = cert.to_pem()?;
            let key_pem = key.to_pem()?;
            write_pair(&args.key, key_pem.as_bytes(), &args.cert, cert_pem.as_bytes())?;
        }
    }

    let output = IssueOutput {
        certificate: args.cert,
        private_key: args.key,
        format: args.format,
        certificate_size: cert.len(),
        quote_size: evidence.quote.len(),
        report_data: evidence.report_data.to_hex(),
        simulated,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Write the key, then the certificate. A certificate is never left on disk
/// without its key: if the certificate write fails, the key file is removed.
fn write_pair(
    key_path: &Path,
    key: &[u8],
    cert_path: &Path,
    cert: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    write_file(key_path, key, true)
        .map_err(|e| format!("Failed to write private key {}: {}", key_path.display(), e))?;

    if let Err(e) = write_file(cert_path, cert, false) {
        if let Err(rm) = std::fs::remove_file(key_path) {
            tracing::warn!(path = %key_path.display(), error = %rm, "Failed to remove private key");
        }
        return Err(format!("Failed to write certificate {}: {}", cert_path.display(), e).into());
    }
    Ok(())
}
