//! SWU Generator - SWUpdate package builder
//!
//! Builds SWU update packages from a sw-description template and a set of
//! artifact files, and re-signs existing packages. Compression, encryption
//! and signing are delegated to external tools.

pub mod artifact;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod generator;
pub mod logging;
pub mod resign;
pub mod signing;
pub mod tools;

pub use artifact::{Artifact, ArtifactError};
pub use config::{GeneratorConfig, KeyMaterial, ProcessingFlags, ResignConfig};
pub use descriptor::Descriptor;
pub use error::{GeneratorError, Result};
pub use generator::Generator;
pub use resign::Resigner;
pub use signing::{SignError, SignRequest};
pub use tools::{SystemRunner, ToolCommand, ToolError, ToolOutput, ToolRunner};
