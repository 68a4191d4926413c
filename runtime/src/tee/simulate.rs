//! Simulated attestation source for development and testing.
//!
//! When `RA_TLS_SIMULATE=1` is set, the CLI issues certificates against an
//! in-memory device that produces fake SGX quotes with the correct report
//! data placement but no signature. Verifiers accept these only through
//! [`SimulatedQuoteVerifier`](super::verifier::SimulatedQuoteVerifier).

use std::io::{self, Cursor, Read, Write};
use std::sync::Mutex;

use super::channel::{AttestationDevice, AttestationResource, ChannelHandle};

/// Environment variable to enable simulation mode.
pub const TEE_SIMULATE_ENV: &str = "RA_TLS_SIMULATE";

/// Check if simulation mode is enabled via environment variable.
pub fn is_simulate_mode() -> bool {
    simulate_mode_from(|key| std::env::var(key).ok())
}

/// Check simulation mode through an arbitrary environment-style lookup.
/// Accepts `1` or `true` (any case).
pub fn simulate_mode_from<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(TEE_SIMULATE_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Simulated quote version marker.
/// Real SGX quotes use version 2 or 3; simulated quotes use 0xA3.
pub const SIMULATED_QUOTE_VERSION: u16 = 0xA3;

/// Size of the report data field inside an SGX report body.
pub const SGX_REPORT_DATA_SIZE: usize = 64;

/// Offset of the report data: 48-byte quote header + 320 bytes of report body.
const QUOTE_REPORT_DATA_OFFSET: usize = 48 + 320;

/// Header, report body, and a zero signature length.
const SIMULATED_QUOTE_SIZE: usize = 48 + 384 + 4;

/// Build a simulated quote carrying `report_data`.
///
/// The quote follows the SGX quote layout (header, report body, signature
/// length) with the marker version and an empty signature.
pub fn build_simulated_quote(report_data: &[u8; SGX_REPORT_DATA_SIZE]) -> Vec<u8> {
    let mut quote = vec![0u8; SIMULATED_QUOTE_SIZE];

    // version at 0x00 (2 bytes LE)
    quote[0x00..0x02].copy_from_slice(&SIMULATED_QUOTE_VERSION.to_le_bytes());

    // mr_enclave at header + 64 (32 bytes): deterministic fake measurement
    for i in 0..32 {
        quote[48 + 64 + i] = (i as u8).wrapping_mul(0xA3);
    }

    quote[QUOTE_REPORT_DATA_OFFSET..QUOTE_REPORT_DATA_OFFSET + SGX_REPORT_DATA_SIZE]
        .copy_from_slice(report_data);

    // signature_len at 0x1B0: left as zero (simulation marker)

    quote
}

/// Check if a quote is a simulated quote (version == 0xA3).
pub fn is_simulated_quote(quote: &[u8]) -> bool {
    if quote.len() < 2 {
        return false;
    }
    u16::from_le_bytes([quote[0], quote[1]]) == SIMULATED_QUOTE_VERSION
}

/// Report data carried by a simulated quote.
pub fn simulated_quote_report_data(quote: &[u8]) -> Option<&[u8]> {
    if !is_simulated_quote(quote) {
        return None;
    }
    quote.get(QUOTE_REPORT_DATA_OFFSET..QUOTE_REPORT_DATA_OFFSET + SGX_REPORT_DATA_SIZE)
}

// ============================================================================
// In-memory device
// ============================================================================

/// In-memory attestation source.
///
/// Records the report data written to it and answers quote reads either with
/// a simulated quote over that report data or with a fixed payload.
#[derive(Debug, Default)]
pub struct SimulatedDevice {
    report_data: Mutex<Option<Vec<u8>>>,
    fixed_quote: Option<Vec<u8>>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that answers every quote read with `quote`, regardless of the
    /// report data written.
    pub fn with_fixed_quote(quote: Vec<u8>) -> Self {
        Self {
            report_data: Mutex::new(None),
            fixed_quote: Some(quote),
        }
    }

    /// Report data most recently written to the device.
    pub fn last_report_data(&self) -> Option<Vec<u8>> {
        self.report_data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn current_quote(&self) -> Vec<u8> {
        if let Some(quote) = &self.fixed_quote {
            return quote.clone();
        }
        let mut data = [0u8; SGX_REPORT_DATA_SIZE];
        if let Some(written) = self.last_report_data() {
            let len = written.len().min(SGX_REPORT_DATA_SIZE);
            data[..len].copy_from_slice(&written[..len]);
        }
        build_simulated_quote(&data)
    }
}

impl AttestationDevice for SimulatedDevice {
    fn open(&self, resource: AttestationResource) -> io::Result<Box<dyn ChannelHandle + '_>> {
        match resource {
            AttestationResource::ReportInput => {
                Ok(Box::new(ReportWriter { device: self, buf: Vec::new() }))
            }
            AttestationResource::QuoteOutput => {
                Ok(Box::new(QuoteReader(Cursor::new(self.current_quote()))))
            }
        }
    }

    fn locate(&self, resource: AttestationResource) -> String {
        format!("simulated:{}", resource)
    }
}

struct ReportWriter<'a> {
    device: &'a SimulatedDevice,
    buf: Vec<u8>,
}

impl Write for ReportWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = data.len().min(SGX_REPORT_DATA_SIZE - self.buf.len());
        self.buf.extend_from_slice(&data[..n]);
        *self
            .device
            .report_data
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(self.buf.clone());
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for ReportWriter<'_> {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "report input is write-only"))
    }
}

struct QuoteReader(Cursor<Vec<u8>>);

impl Read for QuoteReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for QuoteReader {
    fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "quote output is read-only"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
