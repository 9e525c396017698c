//! Archive writer.
//!
//! Members are written in the order they are added. Each header and each
//! payload starts on a 4-byte boundary, and the stream is padded to 512
//! bytes after the trailer. Inode numbers are assigned by the writer,
//! starting at 1, so that 64-bit filesystem inodes never reach the 32-bit
//! header field.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::checksum::{checksum_reader, CHUNK_SIZE};
use crate::error::FormatViolation;
use crate::header::MemberHeader;
use crate::{padding_for, Result, BLOCK_SIZE, MAX_FIELD_VALUE, MEMBER_ALIGNMENT, TRAILER_NAME};

/// Streaming archive writer over any byte sink.
pub struct ArchiveWriter<W: Write> {
    inner: W,
    /// Bytes written since the last trailer
    position: u64,
    /// Inode handed to the next member
    next_inode: u64,
}

impl<W: Write> ArchiveWriter<W> {
    /// Create a writer positioned at the start of an archive
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            position: 0,
            next_inode: 1,
        }
    }

    /// Bytes written since the start of the archive
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Get a reference to the underlying sink
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the writer and return the underlying sink
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn raw_write(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    fn pad_to(&mut self, boundary: u64) -> io::Result<()> {
        let padding = padding_for(self.position, boundary);
        if padding > 0 {
            self.raw_write(&vec![0u8; padding as usize])?;
        }
        Ok(())
    }

    /// Write a header, assigning it the next inode number.
    ///
    /// The inode carried by `header` is ignored. Returns the inode used.
    pub fn write_header(&mut self, header: &MemberHeader) -> Result<u64> {
        let inode = self.next_inode;
        let renumbered = MemberHeader {
            inode,
            ..header.clone()
        };
        self.emit_header(&renumbered)?;
        self.next_inode += 1;
        Ok(inode)
    }

    fn emit_header(&mut self, header: &MemberHeader) -> Result<()> {
        // Encode first so an out-of-range field leaves the stream untouched
        let encoded = header.encode()?;
        self.pad_to(MEMBER_ALIGNMENT)?;
        self.raw_write(&encoded)?;
        Ok(())
    }

    /// Append the file at `path` as a member named after its base name.
    ///
    /// The file must be a regular, non-empty file no larger than
    /// 0xFFFFFFFF bytes. Returns the header that was written.
    pub fn write_member(&mut self, path: &Path) -> Result<MemberHeader> {
        let metadata = fs::metadata(path)?;
        let size = metadata.len();

        // Checked first: the most common failure with this format
        if size > MAX_FIELD_VALUE {
            return Err(FormatViolation::TooLarge {
                path: path.to_path_buf(),
                size,
            }
            .into());
        }
        if !metadata.is_file() || size == 0 {
            return Err(FormatViolation::NotRegularFile(path.to_path_buf()).into());
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FormatViolation::InvalidName(path.display().to_string()))?;
        if name == TRAILER_NAME {
            return Err(FormatViolation::ReservedName(name.to_string()).into());
        }

        let mut file = File::open(path)?;
        let opened = file.metadata()?;
        if opened.len() != size {
            return Err(FormatViolation::ChangedWhileReading(path.to_path_buf()).into());
        }

        let checksum = checksum_reader(&mut file)?;
        file.seek(SeekFrom::Start(0))?;

        let mut header = MemberHeader::from_metadata(name, &opened, checksum);
        header.inode = self.write_header(&header)?;
        debug!(
            member = name,
            inode = header.inode,
            size,
            checksum,
            "writing archive member"
        );

        self.pad_to(MEMBER_ALIGNMENT)?;
        self.copy_payload(&mut file, size, path)?;

        Ok(header)
    }

    /// Stream `size` bytes of `source`; running short means the file shrank.
    fn copy_payload<S: Read>(&mut self, source: &mut S, size: u64, path: &Path) -> Result<()> {
        let mut remaining = size;
        let mut buf = vec![0u8; CHUNK_SIZE];
        while remaining > 0 {
            let want = remaining.min(CHUNK_SIZE as u64) as usize;
            let n = match source.read(&mut buf[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.raw_write(&buf[..n])?;
            remaining -= n as u64;
        }
        if remaining > 0 {
            return Err(FormatViolation::ChangedWhileReading(path.to_path_buf()).into());
        }
        Ok(())
    }

    /// Write the trailer, pad the archive to 512 bytes and flush.
    ///
    /// The writer position is reset so that another archive can follow.
    pub fn finish(&mut self) -> Result<()> {
        self.emit_header(&MemberHeader::trailer())?;
        self.pad_to(BLOCK_SIZE)?;
        self.position = 0;

        match self.inner.flush() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Unsupported => {
                warn!(error = %e, "archive sink does not support flushing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
