//! `ratls inspect` command: show the evidence in an RA-TLS certificate.

use std::path::PathBuf;

use clap::Args;
use der::Decode;
use ratls_runtime::tee::{
    extract_evidence, verify_self_signature, QuoteVerifier, SimulatedQuoteVerifier,
};
use x509_cert::Certificate;

use crate::output::{format_unix, read_certificate, Format};

#[derive(Args)]
pub struct InspectArgs {
    /// Certificate file
    pub cert: PathBuf,

    /// Input encoding
    #[arg(long, value_enum, default_value_t = Format::Der)]
    pub format: Format,

    /// Include the raw quote (hex-encoded)
    #[arg(long)]
    pub quote: bool,
}

/// JSON output for the inspect command.
#[derive(Debug, serde::Serialize)]
struct InspectOutput {
    subject: String,
    issuer: String,
    serial: String,
    not_before: String,
    not_after: String,
    /// SHA-256 of the subject key, hex-encoded
    report_data: String,
    quote_size: usize,
    simulated: bool,
    self_signature_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    self_signature_error: Option<String>,
    /// Set only for simulated quotes, whose binding can be checked locally
    #[serde(skip_serializing_if = "Option::is_none")]
    simulated_quote_bound: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote_hex: Option<String>,
}

pub fn execute(args: InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cert_der = read_certificate(&args.cert, args.format)?;
    let output = inspect(&cert_der, args.quote)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn inspect(cert_der: &[u8], include_quote: bool) -> Result<InspectOutput, Box<dyn std::error::Error>> {
    let cert = Certificate::from_der(cert_der)?;
    let tbs = &cert.tbs_certificate;
    let evidence = extract_evidence(cert_der)?;

    let signature = verify_self_signature(cert_der);
    let simulated = evidence.is_simulated();
    let simulated_quote_bound =
        simulated.then(|| SimulatedQuoteVerifier.verify_quote(&evidence).is_ok());

    Ok(InspectOutput {
        subject: tbs.subject.to_string(),
        issuer: tbs.issuer.to_string(),
        serial: hex::encode(tbs.serial_number.as_bytes()),
        not_before: format_unix(tbs.validity.not_before.to_unix_duration().as_secs()),
        not_after: format_unix(tbs.validity.not_after.to_unix_duration().as_secs()),
        report_data: evidence.report_data.to_hex(),
        quote_size: evidence.quote.len(),
        simulated,
        self_signature_valid: signature.is_ok(),
        self_signature_error: signature.err().map(|e| e.to_string()),
        simulated_quote_bound,
        quote_hex: include_quote.then(|| hex::encode(&evidence.quote)),
    })
}
