//! zchunk delta artifacts
//!
//! A delta artifact ships only the zchunk header; the device fetches the
//! chunks it is missing. The header length is read from the
//! `zck_read_header` report.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use regex_lite::Regex;

use super::ToolCommand;

/// `type` value selecting delta processing
pub const DELTA_TYPE: &str = "delta";

/// Command chunking `input` into the zchunk file `output`.
pub fn zck_command(input: &Path, output: &Path) -> ToolCommand {
    ToolCommand::new("zck")
        .args(["-u", "--chunk-hash-type", "sha256", "--output"])
        .arg(output)
        .arg(input)
}

/// Command printing the header report of a zchunk file.
pub fn zck_header_command(zck: &Path) -> ToolCommand {
    ToolCommand::new("zck_read_header").arg("-v").arg(zck)
}

/// Extract the header length from a `zck_read_header` report.
pub fn parse_header_size(report: &str) -> Option<u64> {
    let re = Regex::new(r"Header size:\s*(\d+)").ok()?;
    re.captures(report)?.get(1)?.as_str().parse().ok()
}

/// Copy the first `size` bytes of `source` into `dest`.
///
/// Returns the number of bytes copied, which is smaller than `size` when
/// `source` is shorter.
pub fn copy_header(source: &Path, dest: &Path, size: u64) -> io::Result<u64> {
    let input = File::open(source)?;
    let mut output = File::create(dest)?;
    io::copy(&mut input.take(size), &mut output)
}
