//! Member checksum.
//!
//! The "CRC" of the new-CRC cpio format is a plain byte sum truncated to
//! 32 bits, not a cyclic redundancy check.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used when summing files.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Sum of all bytes, modulo 2^32.
pub fn checksum_bytes(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}

/// Checksum everything readable from `reader`.
pub fn checksum_reader<R: Read>(mut reader: R) -> io::Result<u32> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sum = 0u32;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sum = sum.wrapping_add(checksum_bytes(&buf[..n]));
    }
    Ok(sum)
}

/// Checksum a file on disk.
pub fn checksum_file(path: &Path) -> io::Result<u32> {
    checksum_reader(File::open(path)?)
}
