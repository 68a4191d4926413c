//! Byte-channel access to the attestation source.
//!
//! The attestation source exposes two named resources: an input that accepts
//! report data and an output that returns the quote generated for it. Each
//! transfer opens its resource, moves the bytes, and closes the handle when
//! it goes out of scope.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Named resources exposed by the attestation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttestationResource {
    /// Accepts the report data to bind into the next quote.
    ReportInput,
    /// Returns the quote for the last report data written.
    QuoteOutput,
}

impl AttestationResource {
    /// File name of the resource under a device root.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ReportInput => "user_report_data",
            Self::QuoteOutput => "quote",
        }
    }
}

impl std::fmt::Display for AttestationResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReportInput => write!(f, "report-input"),
            Self::QuoteOutput => write!(f, "quote-output"),
        }
    }
}

/// An open attestation resource.
pub trait ChannelHandle: Read + Write {}

impl<T: Read + Write> ChannelHandle for T {}

/// Source of attestation quotes, addressed through named byte resources.
pub trait AttestationDevice {
    /// Open `resource` for one transfer. The handle is closed on drop.
    fn open(&self, resource: AttestationResource) -> io::Result<Box<dyn ChannelHandle + '_>>;

    /// Human-readable location of `resource`, used in error messages.
    fn locate(&self, resource: AttestationResource) -> String {
        resource.to_string()
    }
}

impl<D: AttestationDevice + ?Sized> AttestationDevice for &D {
    fn open(&self, resource: AttestationResource) -> io::Result<Box<dyn ChannelHandle + '_>> {
        (**self).open(resource)
    }

    fn locate(&self, resource: AttestationResource) -> String {
        (**self).locate(resource)
    }
}

impl<D: AttestationDevice + ?Sized> AttestationDevice for Box<D> {
    fn open(&self, resource: AttestationResource) -> io::Result<Box<dyn ChannelHandle + '_>> {
        (**self).open(resource)
    }

    fn locate(&self, resource: AttestationResource) -> String {
        (**self).locate(resource)
    }
}

/// Write `data` to `resource`, retrying transient interruptions.
///
/// Returns the number of bytes accepted, which is less than `data.len()`
/// when the resource stops accepting input early.
pub fn write_resource<D: AttestationDevice + ?Sized>(
    device: &D,
    resource: AttestationResource,
    data: &[u8],
) -> io::Result<usize> {
    let mut handle = device.open(resource)?;
    let mut written = 0;

    while written < data.len() {
        match handle.write(&data[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if is_transient(&e) => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(written)
}

const READ_CHUNK_SIZE: usize = 4096;

/// Read up to `max_len` bytes from `resource`, retrying transient
/// interruptions. End of file before `max_len` is a short read, not an error.
///
/// The buffer grows with the bytes actually returned, so `max_len` is only a
/// ceiling and is never allocated up front.
pub fn read_resource<D: AttestationDevice + ?Sized>(
    device: &D,
    resource: AttestationResource,
    max_len: usize,
) -> io::Result<Vec<u8>> {
    let mut handle = device.open(resource)?;
    let mut limited = (&mut *handle).take(max_len as u64);
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        match limited.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) if is_transient(&e) => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(buf)
}

fn is_transient(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock)
}

// ============================================================================
// Filesystem-backed device
// ============================================================================

/// Attestation pseudo-files under a directory (`/dev/attestation` by default).
#[derive(Debug, Clone)]
pub struct DevAttestation {
    root: PathBuf,
}

impl DevAttestation {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `resource` under the device root.
    pub fn path(&self, resource: AttestationResource) -> PathBuf {
        self.root.join(resource.file_name())
    }

    /// Returns true if both attestation resources exist.
    pub fn is_available(&self) -> bool {
        self.path(AttestationResource::ReportInput).exists()
            && self.path(AttestationResource::QuoteOutput).exists()
    }
}

impl AttestationDevice for DevAttestation {
    fn open(&self, resource: AttestationResource) -> io::Result<Box<dyn ChannelHandle + '_>> {
        let path = self.path(resource);
        let file = match resource {
            AttestationResource::ReportInput => OpenOptions::new().write(true).open(path)?,
            AttestationResource::QuoteOutput => File::open(path)?,
        };
        Ok(Box::new(file))
    }

    fn locate(&self, resource: AttestationResource) -> String {
        self.path(resource).display().to_string()
    }
}
