//! sw-description template expansion
//!
//! Two passes run over the raw text before it is parsed:
//! 1. `@@NAME@@` placeholders are replaced by configured variables
//! 2. `$function(argument)` calls from a fixed registry are evaluated
//!
//! Unknown variables and unknown functions are errors.

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex_lite::Regex;

use crate::artifact::{Artifact, ArtifactError};

/// Template expansion errors
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("undefined variable @@{0}@@")]
    UnknownVariable(String),

    #[error("unknown function ${0}()")]
    UnknownFunction(String),

    #[error("invalid template pattern: {0}")]
    Pattern(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

fn regex(pattern: &str) -> Result<Regex, TemplateError> {
    Regex::new(pattern).map_err(|e| TemplateError::Pattern(e.to_string()))
}

/// Replace every `@@NAME@@` with its value.
pub fn expand_variables(
    text: &str,
    variables: &BTreeMap<String, String>,
) -> Result<String, TemplateError> {
    let re = regex(r"@@(\w+)@@")?;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = variables
            .get(name.as_str())
            .ok_or_else(|| TemplateError::UnknownVariable(name.as_str().to_string()))?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Functions callable from a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFunction {
    /// `$swupdate_get_sha256(name)`: content hash of an artifact
    Sha256,
    /// `$swupdate_get_size(name)`: size of an artifact, `0` if absent
    Size,
}

impl TemplateFunction {
    pub const ALL: [TemplateFunction; 2] = [TemplateFunction::Sha256, TemplateFunction::Size];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            TemplateFunction::Sha256 => "swupdate_get_sha256",
            TemplateFunction::Size => "swupdate_get_size",
        }
    }

    /// Evaluate for an artifact name, searching `dirs`.
    pub fn call(self, argument: &str, dirs: &[PathBuf]) -> Result<String, TemplateError> {
        let mut artifact = Artifact::new(argument);
        match self {
            TemplateFunction::Sha256 => {
                artifact.resolve(dirs)?;
                Ok(artifact.sha256().to_string())
            }
            TemplateFunction::Size => match artifact.resolve(dirs) {
                Ok(()) => Ok(artifact.size().to_string()),
                Err(ArtifactError::NotFound { .. }) => Ok("0".to_string()),
                Err(e) => Err(e.into()),
            },
        }
    }
}

/// Evaluate every `$function(argument)` call.
///
/// All names are checked before anything is evaluated.
pub fn expand_functions(text: &str, dirs: &[PathBuf]) -> Result<String, TemplateError> {
    let re = regex(r"\$(\w+)\(([^()\n]*)\)")?;

    let mut calls = Vec::new();
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(name), Some(arg)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let function = TemplateFunction::from_name(name.as_str())
            .ok_or_else(|| TemplateError::UnknownFunction(name.as_str().to_string()))?;
        calls.push((whole.start(), whole.end(), function, unquote(arg.as_str())));
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end, function, arg) in calls {
        out.push_str(&text[last..start]);
        out.push_str(&function.call(arg, dirs)?);
        last = end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn unquote(arg: &str) -> &str {
    let arg = arg.trim();
    arg.strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .or_else(|| arg.strip_prefix('\'').and_then(|a| a.strip_suffix('\'')))
        .unwrap_or(arg)
}
