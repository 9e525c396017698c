//! Archive reader.
//!
//! Walks the member stream header by header until the trailer, extracting
//! each payload and verifying its checksum against the header.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path};

use tracing::{debug, warn};

use crate::checksum::{checksum_file, CHUNK_SIZE};
use crate::error::FormatViolation;
use crate::header::MemberHeader;
use crate::{padding_for, Result, HEADER_LEN, MEMBER_ALIGNMENT};

/// Longest member name accepted, NUL included (`PATH_MAX`)
pub const MAX_NAME_SIZE: u64 = 4096;

/// Streaming archive reader over any byte source.
pub struct ArchiveReader<R: Read> {
    inner: R,
    /// Bytes consumed so far, used for alignment
    position: u64,
}

impl<R: Read> ArchiveReader<R> {
    /// Create a reader positioned at the start of an archive
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> u64 {
        self.position
    }

    fn read_exact_counted(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.inner.read_exact(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn skip_to_alignment(&mut self) -> io::Result<()> {
        let padding = padding_for(self.position, MEMBER_ALIGNMENT) as usize;
        if padding > 0 {
            let mut pad = [0u8; MEMBER_ALIGNMENT as usize];
            self.read_exact_counted(&mut pad[..padding])?;
        }
        Ok(())
    }

    /// Read the next member header.
    ///
    /// Returns `None` at the trailer. On success the reader is positioned
    /// at the first payload byte.
    pub fn next_header(&mut self) -> Result<Option<MemberHeader>> {
        self.skip_to_alignment()?;

        let mut fixed = [0u8; HEADER_LEN];
        self.read_exact_counted(&mut fixed)?;
        let (mut header, name_size) = MemberHeader::decode(&fixed)?;

        if name_size == 0 {
            return Err(FormatViolation::UnterminatedName.into());
        }
        if name_size > MAX_NAME_SIZE {
            return Err(FormatViolation::InvalidName(format!(
                "<{} byte name>",
                name_size
            ))
            .into());
        }
        let mut name = vec![0u8; name_size as usize];
        self.read_exact_counted(&mut name)?;
        if name.pop() != Some(0) {
            return Err(FormatViolation::UnterminatedName.into());
        }
        header.name = String::from_utf8(name)
            .map_err(|e| FormatViolation::InvalidName(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;

        if header.is_trailer() {
            return Ok(None);
        }

        self.skip_to_alignment()?;
        Ok(Some(header))
    }

    /// Copy exactly `size` payload bytes into `out`.
    fn copy_payload<W: Write>(&mut self, size: u64, out: &mut W) -> io::Result<()> {
        let mut remaining = size;
        let mut buf = vec![0u8; CHUNK_SIZE];
        while remaining > 0 {
            let want = remaining.min(CHUNK_SIZE as u64) as usize;
            self.read_exact_counted(&mut buf[..want])?;
            out.write_all(&buf[..want])?;
            remaining -= want as u64;
        }
        Ok(())
    }

    /// Extract every member into `destination`.
    ///
    /// Returns member names in archive order. Extraction stops at the
    /// trailer; a checksum mismatch or a bad header aborts it.
    pub fn extract_all(&mut self, destination: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();

        while let Some(header) = self.next_header()? {
            validate_member_name(&header.name)?;
            let target = destination.join(&header.name);

            if header.is_directory() {
                fs::create_dir_all(&target)?;
                self.copy_payload(header.file_size, &mut io::sink())?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut file = File::create(&target)?;
                self.copy_payload(header.file_size, &mut file)?;
                file.flush()?;
                drop(file);

                restore_permissions(&target, header.permissions());

                let actual = checksum_file(&target)?;
                let expected = header.checksum as u32;
                if actual != expected {
                    return Err(FormatViolation::ChecksumMismatch {
                        name: header.name,
                        expected,
                        actual,
                    }
                    .into());
                }
            }

            debug!(member = %header.name, size = header.file_size, "extracted archive member");
            names.push(header.name);
        }

        Ok(names)
    }
}

/// Member names must stay inside the extraction directory.
fn validate_member_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let escapes = name.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(FormatViolation::InvalidName(name.to_string()).into());
    }
    Ok(())
}

fn restore_permissions(path: &Path, mode: u32) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
            warn!(path = %path.display(), error = %e, "cannot restore permissions");
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }
}
