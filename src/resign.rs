//! Re-signing existing archives
//!
//! The input archive is extracted into a scratch directory, its first
//! member (the manifest) is signed again and everything is re-packed. A
//! `<manifest>.sig` member is inserted right after the manifest when the
//! input was unsigned.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};

use swu_cpio::{ArchiveReader, ArchiveWriter};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::config::ResignConfig;
use crate::error::{GeneratorError, Result};
use crate::tools::{SystemRunner, ToolRunner};

/// Re-signs one SWU archive
pub struct Resigner<R: ToolRunner = SystemRunner> {
    config: ResignConfig,
    runner: R,
    scratch: TempDir,
    writer: ArchiveWriter<BufWriter<File>>,
}

impl<R: ToolRunner> Resigner<R> {
    /// Create the output file and the scratch directory.
    pub fn new(config: ResignConfig, runner: R) -> Result<Self> {
        if let (Ok(input), Ok(output)) = (
            fs::canonicalize(&config.input),
            fs::canonicalize(&config.output),
        ) {
            if input == output {
                return Err(GeneratorError::Config(format!(
                    "{} cannot be re-signed in place",
                    config.input.display()
                )));
            }
        }

        let file = File::create(&config.output).map_err(|e| {
            GeneratorError::Config(format!("cannot create {}: {}", config.output.display(), e))
        })?;
        let scratch = TempDir::new()?;

        Ok(Self {
            config,
            runner,
            scratch,
            writer: ArchiveWriter::new(BufWriter::new(file)),
        })
    }

    /// Extract, sign and re-pack. Returns the member names written.
    pub fn process(&mut self) -> Result<Vec<String>> {
        let input = File::open(&self.config.input).map_err(|e| {
            GeneratorError::Config(format!("cannot open {}: {}", self.config.input.display(), e))
        })?;
        let mut reader = ArchiveReader::new(BufReader::new(input));
        let mut members = reader.extract_all(self.scratch.path())?;
        debug!(count = members.len(), "extracted members");

        let Some(manifest) = members.first().cloned() else {
            return Err(GeneratorError::Config(format!(
                "{} has no members",
                self.config.input.display()
            )));
        };

        if let Some(ref signer) = self.config.signer {
            let signature = format!("{}.sig", manifest);
            info!(method = signer.method(), manifest = %manifest, "signing manifest");
            self.runner.run(&signer.build_command(
                &self.scratch.path().join(&manifest),
                &self.scratch.path().join(&signature),
            ))?;

            if members.contains(&signature) {
                info!(signature = %signature, "re-signing an already signed archive");
            } else {
                members.insert(1, signature);
            }
        }

        for name in &members {
            self.writer.write_member(&self.scratch.path().join(name))?;
        }
        info!(output = %self.config.output.display(), members = members.len(), "archive re-packed");
        Ok(members)
    }

    /// Write the trailer and remove the scratch directory.
    pub fn close(self) -> Result<()> {
        let Resigner {
            mut writer,
            scratch,
            ..
        } = self;
        writer.finish()?;
        drop(writer);
        scratch.close()?;
        Ok(())
    }
}
