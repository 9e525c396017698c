//! External tool invocation
//!
//! Compressors, the delta encoder, the symmetric encryptor and the signers
//! are external programs. Their command lines are built as data
//! ([`ToolCommand`]) and executed through the [`ToolRunner`] seam:
//! - `SystemRunner`: spawns real processes
//! - test runners: emulate the tools in-process

mod compress;
mod delta;
mod encrypt;

pub use compress::Compression;
pub use delta::{copy_header, parse_header_size, zck_command, zck_header_command, DELTA_TYPE};
pub use encrypt::{encrypt_command, generate_iv, IV_LEN};

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program name or path
    pub program: String,
    /// Arguments, in order
    pub args: Vec<OsString>,
    /// File receiving the program's standard output, if redirected
    pub stdout_path: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout_path: None,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Redirect standard output into `path`
    pub fn stdout_to(mut self, path: &Path) -> Self {
        self.stdout_path = Some(path.to_path_buf());
        self
    }

    /// Arguments as lossy strings, for inspection
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        if let Some(ref out) = self.stdout_path {
            write!(f, " > {}", out.display())?;
        }
        Ok(())
    }
}

/// Output of a successful tool run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Captured standard output (empty when redirected to a file)
    pub stdout: String,
}

/// Tool failures. Every variant names the command line.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("cannot run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from `{command}`: {message}")]
    Output { command: String, message: String },
}

/// Runs external commands to completion.
pub trait ToolRunner {
    /// Run `command`, failing on a non-zero exit status
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        (**self).run(command)
    }
}

/// Runner that spawns real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        debug!(command = %command, "running external tool");
        let spawn_error = |source| ToolError::Spawn {
            command: command.to_string(),
            source,
        };

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped());
        match command.stdout_path {
            Some(ref path) => {
                let file = File::create(path).map_err(spawn_error)?;
                cmd.stdout(Stdio::from(file));
            }
            None => {
                cmd.stdout(Stdio::piped());
            }
        }

        let output = cmd.output().map_err(spawn_error)?;
        if !output.status.success() {
            return Err(ToolError::Failed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
