//! Error types for the archive codec.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the reader and writer.
#[derive(Debug, Error)]
pub enum CpioError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cpio format violation: {0}")]
    Format(#[from] FormatViolation),
}

impl CpioError {
    /// Get the format violation, if this error is one
    pub fn format_violation(&self) -> Option<&FormatViolation> {
        match self {
            CpioError::Format(v) => Some(v),
            CpioError::Io(_) => None,
        }
    }
}

/// A member or stream that does not fit the fixed-field layout.
///
/// Raised before any byte of the offending member is written, except for
/// [`FormatViolation::ChangedWhileReading`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatViolation {
    #[error("too big file size for this cpio format: {path} is {size} bytes")]
    TooLarge { path: PathBuf, size: u64 },

    #[error("file is not a regular non-empty file: {0}")]
    NotRegularFile(PathBuf),

    #[error("attempt to pass reserved filename: {0}")]
    ReservedName(String),

    #[error("invalid member name: {0:?}")]
    InvalidName(String),

    #[error("header field {field} out of range: {value:#x}")]
    FieldOutOfRange { field: &'static str, value: u64 },

    #[error("file was changed while reading: {0}")]
    ChangedWhileReading(PathBuf),

    #[error("bad magic {found:?}, expected \"070702\"")]
    BadMagic { found: String },

    #[error("header field {field} is not an 8-digit hex value: {raw:?}")]
    InvalidField { field: &'static str, raw: String },

    #[error("member name is not NUL-terminated")]
    UnterminatedName,

    #[error("checksum mismatch for {name}: header {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },
}
