//! Template variables file
//!
//! libconfig with a top-level `variables` group, or TOML with a
//! `[variables]` table when the file name ends in `.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use swu_libconf::Node;
use tracing::{debug, info};

use super::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct TomlVariables {
    #[serde(default)]
    variables: BTreeMap<String, toml::Value>,
}

/// Load template variables. Scalar values are stringified.
pub fn load_variables(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    info!(path = %path.display(), "reading configuration file");
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let vars = if path.extension().is_some_and(|ext| ext == "toml") {
        from_toml(&contents)?
    } else {
        from_libconf(&contents)?
    };

    for (name, value) in &vars {
        debug!(%name, %value, "template variable");
    }
    Ok(vars)
}

fn from_libconf(contents: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let root = swu_libconf::parse(contents)
        .map_err(|e| ConfigError::ParseError(format!("libconfig parse error: {}", e)))?;

    let Some(node) = root.get("variables") else {
        return Ok(BTreeMap::new());
    };
    let group = node.as_group().ok_or_else(|| {
        ConfigError::ValidationError("`variables` must be a group".to_string())
    })?;

    group
        .iter()
        .map(|(name, value)| match value {
            Node::Scalar(scalar) => Ok((name.to_string(), scalar.to_string())),
            _ => Err(ConfigError::ValidationError(format!(
                "variable {} must be a scalar",
                name
            ))),
        })
        .collect()
}

fn from_toml(contents: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let file: TomlVariables = toml::from_str(contents)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    file.variables
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(dt) => dt.to_string(),
                toml::Value::Array(_) | toml::Value::Table(_) => {
                    return Err(ConfigError::ValidationError(format!(
                        "variable {} must be a scalar",
                        name
                    )))
                }
            };
            Ok((name, value))
        })
        .collect()
}
