//! Compression command lines

use std::path::Path;

use super::ToolCommand;

/// Supported compression algorithms, named by their descriptor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Zlib,
    Zstd,
}

impl Compression {
    /// Parse the value of a `compressed` setting. Only exact names are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "zlib" => Some(Compression::Zlib),
            "zstd" => Some(Compression::Zstd),
            _ => None,
        }
    }

    /// Descriptor name, also used as the output file extension
    pub fn name(self) -> &'static str {
        match self {
            Compression::Zlib => "zlib",
            Compression::Zstd => "zstd",
        }
    }

    /// Command compressing `input` into `output`.
    ///
    /// Both tools write to stdout, which is redirected into `output`.
    pub fn command(self, input: &Path, output: &Path) -> ToolCommand {
        match self {
            Compression::Zlib => ToolCommand::new("gzip")
                .args(["-f", "-9", "-n", "-c", "--rsyncable"])
                .arg(input),
            Compression::Zstd => ToolCommand::new("zstd")
                .args(["-z", "-k", "-T0", "-f", "-c"])
                .arg(input),
        }
        .stdout_to(output)
    }
}
