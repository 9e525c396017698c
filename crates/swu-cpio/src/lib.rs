//! SWU archive codec
//!
//! Reads and writes the cpio "new CRC" container (magic `070702`) that frames
//! every member of an SWU update package. Only the fixed-field ASCII-hex
//! layout is supported; there is no general cpio support.

pub mod checksum;
pub mod error;
pub mod header;
pub mod reader;
pub mod writer;

pub use checksum::{checksum_bytes, checksum_file, checksum_reader};
pub use error::{CpioError, FormatViolation};
pub use header::MemberHeader;
pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;

/// Magic token at the start of every member header.
pub const MAGIC: &[u8; 6] = b"070702";

/// Name of the sentinel member terminating the archive.
pub const TRAILER_NAME: &str = "TRAILER!!!";

/// Number of numeric fields in a header.
pub const FIELD_COUNT: usize = 13;

/// Width of one hex field in bytes.
pub const FIELD_WIDTH: usize = 8;

/// Fixed header length: magic plus thirteen 8-digit hex fields.
pub const HEADER_LEN: usize = MAGIC.len() + FIELD_COUNT * FIELD_WIDTH;

/// Largest value a header field can carry.
pub const MAX_FIELD_VALUE: u64 = 0xFFFF_FFFF;

/// Alignment of headers and payloads.
pub const MEMBER_ALIGNMENT: u64 = 4;

/// Alignment of the whole archive after the trailer.
pub const BLOCK_SIZE: u64 = 512;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CpioError>;

/// Number of padding bytes needed to bring `position` to `boundary`.
pub(crate) fn padding_for(position: u64, boundary: u64) -> u64 {
    (boundary - position % boundary) % boundary
}
