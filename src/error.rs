//! Top-level errors and exit codes

use std::io;

use swu_cpio::CpioError;
use swu_libconf::ParseError;

use crate::artifact::ArtifactError;
use crate::config::ConfigError;
use crate::descriptor::TemplateError;
use crate::signing::SignError;
use crate::tools::ToolError;

/// Exit code for an artifact missing from every search directory
pub const EXIT_ARTIFACT_NOT_FOUND: i32 = 22;

/// Exit code for every other failure
pub const EXIT_FAILURE: i32 = 1;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("artifact {0} not found")]
    ArtifactNotFound(String),

    #[error("configuration error: {0}")]
    ConfigFile(#[from] ConfigError),

    #[error("invalid signing spec: {0}")]
    Sign(#[from] SignError),

    #[error("sw-description template error: {0}")]
    Template(TemplateError),

    #[error("sw-description parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("external tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("archive error: {0}")]
    Archive(#[from] CpioError),

    #[error("artifact error: {0}")]
    Artifact(ArtifactError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl GeneratorError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            GeneratorError::ArtifactNotFound(_) => EXIT_ARTIFACT_NOT_FOUND,
            _ => EXIT_FAILURE,
        }
    }
}

impl From<ArtifactError> for GeneratorError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::NotFound { name, .. } => GeneratorError::ArtifactNotFound(name),
            other => GeneratorError::Artifact(other),
        }
    }
}

impl From<TemplateError> for GeneratorError {
    fn from(e: TemplateError) -> Self {
        match e {
            TemplateError::Artifact(inner) => inner.into(),
            other => GeneratorError::Template(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
