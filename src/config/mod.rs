//! Run configuration
//!
//! Everything a run needs is collected up front by the CLI and handed to
//! the pipelines:
//! - `GeneratorConfig`: inputs of `create`
//! - `ResignConfig`: inputs of `sign`
//! - key material and template variables, loaded from files

mod keys;
mod variables;

pub use keys::KeyMaterial;
pub use variables::load_variables;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::signing::SignRequest;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Stages that can be switched off for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingFlags {
    /// Ignore `compressed` settings
    pub no_compress: bool,
    /// Ignore `encrypted` settings
    pub no_encrypt: bool,
    /// Use the configured IV for every artifact instead of random ones
    pub no_ivt: bool,
    /// Do not write `sha256` settings
    pub no_hash: bool,
}

/// Inputs of an archive build
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// sw-description template
    pub sw_description: PathBuf,
    /// Archive to create
    pub output: PathBuf,
    /// Directories searched for artifacts, in order
    pub artifact_dirs: Vec<PathBuf>,
    /// Values for `@@NAME@@` placeholders
    pub variables: BTreeMap<String, String>,
    /// Manifest signer
    pub signer: Option<SignRequest>,
    /// AES key and IV
    pub keys: KeyMaterial,
    /// Encrypt the embedded manifest
    pub encrypt_manifest: bool,
    pub flags: ProcessingFlags,
}

impl GeneratorConfig {
    /// Minimal configuration: no variables, signer, keys or flags
    pub fn new(
        sw_description: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        artifact_dirs: Vec<PathBuf>,
    ) -> Self {
        Self {
            sw_description: sw_description.into(),
            output: output.into(),
            artifact_dirs,
            variables: BTreeMap::new(),
            signer: None,
            keys: KeyMaterial::default(),
            encrypt_manifest: false,
            flags: ProcessingFlags::default(),
        }
    }
}

/// Inputs of a re-sign run
#[derive(Debug, Clone)]
pub struct ResignConfig {
    /// Existing archive
    pub input: PathBuf,
    /// Archive to create
    pub output: PathBuf,
    /// Signer; without one the archive is re-packed unchanged
    pub signer: Option<SignRequest>,
}
