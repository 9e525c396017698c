//! Member header encoding and decoding.
//!
//! Layout (110 bytes, all fields 8 uppercase hex digits):
//! ```text
//! Offset  Field
//! 0       magic "070702"
//! 6       inode
//! 14      mode
//! 22      uid
//! 30      gid
//! 38      nlink
//! 46      mtime (always 0)
//! 54      filesize
//! 62      dev major
//! 70      dev minor
//! 78      rdev major
//! 86      rdev minor
//! 94      namesize (name length + 1)
//! 102     checksum
//! ```
//! The header is followed by the NUL-terminated name.

use std::fs::Metadata;

use crate::error::FormatViolation;
use crate::{FIELD_COUNT, FIELD_WIDTH, HEADER_LEN, MAGIC, MAX_FIELD_VALUE, TRAILER_NAME};

/// Field names in wire order, used for diagnostics.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "inode",
    "mode",
    "uid",
    "gid",
    "nlink",
    "mtime",
    "filesize",
    "dev_major",
    "dev_minor",
    "rdev_major",
    "rdev_minor",
    "namesize",
    "checksum",
];

pub const FIELD_INODE: usize = 0;
pub const FIELD_MODE: usize = 1;
pub const FIELD_FILESIZE: usize = 6;
pub const FIELD_NAMESIZE: usize = 11;
pub const FIELD_CHECKSUM: usize = 12;

/// nlink value carried by the trailer.
const TRAILER_NLINK: u64 = 16;

const S_IFMT: u64 = 0o170_000;
const S_IFDIR: u64 = 0o040_000;

/// Byte offset of a field inside the header.
pub const fn field_offset(index: usize) -> usize {
    MAGIC.len() + index * FIELD_WIDTH
}

/// One member header.
///
/// Numeric fields are kept as `u64` so that values too wide for the
/// format are caught at encode time instead of being truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberHeader {
    /// Base name of the member (without the NUL terminator)
    pub name: String,
    pub inode: u64,
    pub mode: u64,
    pub uid: u64,
    pub gid: u64,
    pub nlink: u64,
    pub mtime: u64,
    pub file_size: u64,
    pub dev_major: u64,
    pub dev_minor: u64,
    pub rdev_major: u64,
    pub rdev_minor: u64,
    /// Byte sum of the payload
    pub checksum: u64,
}

impl MemberHeader {
    /// Build a header from filesystem metadata.
    ///
    /// `mtime` is always 0 so that archives are reproducible. The source
    /// inode is recorded but the writer replaces it.
    pub fn from_metadata(name: impl Into<String>, metadata: &Metadata, checksum: u32) -> Self {
        let mut header = Self {
            name: name.into(),
            nlink: 1,
            file_size: metadata.len(),
            checksum: u64::from(checksum),
            ..Self::default()
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;

            let (dev_major, dev_minor) = split_device(metadata.dev());
            let (rdev_major, rdev_minor) = split_device(metadata.rdev());
            header.inode = metadata.ino();
            header.mode = u64::from(metadata.mode());
            header.uid = u64::from(metadata.uid());
            header.gid = u64::from(metadata.gid());
            header.nlink = metadata.nlink();
            header.dev_major = dev_major;
            header.dev_minor = dev_minor;
            header.rdev_major = rdev_major;
            header.rdev_minor = rdev_minor;
        }
        #[cfg(not(unix))]
        {
            header.mode = 0o100_644;
        }

        header
    }

    /// The sentinel header that closes an archive.
    pub fn trailer() -> Self {
        Self {
            name: TRAILER_NAME.to_string(),
            nlink: TRAILER_NLINK,
            ..Self::default()
        }
    }

    /// Length of the name including the NUL terminator.
    pub fn name_size(&self) -> u64 {
        self.name.len() as u64 + 1
    }

    /// Whether this header is the archive trailer
    pub fn is_trailer(&self) -> bool {
        self.name == TRAILER_NAME
    }

    /// Whether the mode describes a directory
    pub fn is_directory(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    /// Permission bits of the mode
    pub fn permissions(&self) -> u32 {
        (self.mode & 0o7777) as u32
    }

    /// Field values in wire order.
    pub fn fields(&self) -> [u64; FIELD_COUNT] {
        [
            self.inode,
            self.mode,
            self.uid,
            self.gid,
            self.nlink,
            self.mtime,
            self.file_size,
            self.dev_major,
            self.dev_minor,
            self.rdev_major,
            self.rdev_minor,
            self.name_size(),
            self.checksum,
        ]
    }

    /// Encode the header and the NUL-terminated name.
    ///
    /// Fails without producing output if any field exceeds 32 bits.
    pub fn encode(&self) -> Result<Vec<u8>, FormatViolation> {
        let fields = self.fields();
        if let Some((index, &value)) = fields
            .iter()
            .enumerate()
            .find(|&(_, &v)| v > MAX_FIELD_VALUE)
        {
            return Err(FormatViolation::FieldOutOfRange {
                field: FIELD_NAMES[index],
                value,
            });
        }
        if self.name.is_empty() || self.name.contains('\0') {
            return Err(FormatViolation::InvalidName(self.name.clone()));
        }

        let mut out = Vec::with_capacity(HEADER_LEN + self.name.len() + 1);
        out.extend_from_slice(MAGIC);
        for value in fields {
            out.extend_from_slice(format!("{:08X}", value).as_bytes());
        }
        out.extend_from_slice(self.name.as_bytes());
        out.push(0);
        Ok(out)
    }

    /// Decode the fixed part of a header.
    ///
    /// The returned header has an empty name; the caller reads
    /// `namesize` bytes that follow and fills it in.
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<(Self, u64), FormatViolation> {
        if &buf[..MAGIC.len()] != MAGIC {
            return Err(FormatViolation::BadMagic {
                found: String::from_utf8_lossy(&buf[..MAGIC.len()]).into_owned(),
            });
        }

        let mut fields = [0u64; FIELD_COUNT];
        for (index, slot) in fields.iter_mut().enumerate() {
            let start = field_offset(index);
            let raw = &buf[start..start + FIELD_WIDTH];
            *slot = parse_hex_field(raw).ok_or_else(|| FormatViolation::InvalidField {
                field: FIELD_NAMES[index],
                raw: String::from_utf8_lossy(raw).into_owned(),
            })?;
        }

        let header = Self {
            name: String::new(),
            inode: fields[FIELD_INODE],
            mode: fields[FIELD_MODE],
            uid: fields[2],
            gid: fields[3],
            nlink: fields[4],
            mtime: fields[5],
            file_size: fields[FIELD_FILESIZE],
            dev_major: fields[7],
            dev_minor: fields[8],
            rdev_major: fields[9],
            rdev_minor: fields[10],
            checksum: fields[FIELD_CHECKSUM],
        };
        Ok((header, fields[FIELD_NAMESIZE]))
    }
}

fn parse_hex_field(raw: &[u8]) -> Option<u64> {
    if !raw.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(raw).ok()?;
    u64::from_str_radix(text, 16).ok()
}

#[cfg(unix)]
fn split_device(dev: u64) -> (u64, u64) {
    let dev = dev as libc::dev_t;
    (libc::major(dev) as u64, libc::minor(dev) as u64)
}
