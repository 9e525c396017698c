//! AES key file
//!
//! The file holds `key=<hex>` and `iv=<hex>` lines; anything else is
//! ignored.

use std::fs;
use std::path::Path;

use super::ConfigError;

/// Symmetric key and IV, as hex strings
#[derive(Clone, Default, PartialEq, Eq)]
pub struct KeyMaterial {
    pub key: Option<String>,
    pub iv: Option<String>,
}

// Keep key bytes out of logs.
impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("iv", &self.iv)
            .finish()
    }
}

impl KeyMaterial {
    /// Read a key file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::IoError(format!(
                "failed to open file with keys {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::parse(&contents))
    }

    /// Parse key file contents. Later lines override earlier ones.
    pub fn parse(contents: &str) -> Self {
        let mut keys = Self::default();
        for line in contents.lines() {
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            match name.trim() {
                "key" => keys.key = Some(value),
                "iv" => keys.iv = Some(value),
                _ => {}
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_key_and_iv() {
        let keys = KeyMaterial::parse(
            "salt=00\nkey=390ad54490a4a5f53722291023c19e08ffb5c4677a59e958c96ffa6e641df040\niv=d5d601bacfe13100b149177318ebc7a4\n",
        );
        assert_eq!(
            keys.key.as_deref(),
            Some("390ad54490a4a5f53722291023c19e08ffb5c4677a59e958c96ffa6e641df040")
        );
        assert_eq!(keys.iv.as_deref(), Some("d5d601bacfe13100b149177318ebc7a4"));
    }

    #[test]
    fn test_parse_missing_iv() {
        let keys = KeyMaterial::parse("key = abcd\r\n# comment\n");
        assert_eq!(keys.key.as_deref(), Some("abcd"));
        assert_eq!(keys.iv, None);
    }

    #[test]
    fn test_debug_redacts_key() {
        let keys = KeyMaterial::parse("key=deadbeef\n");
        assert!(!format!("{:?}", keys).contains("deadbeef"));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = TempDir::new().unwrap();
        let err = KeyMaterial::from_file(&dir.path().join("nope.key")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aes.key");
        std::fs::write(&path, "key=00ff\niv=11ee\n").unwrap();
        let keys = KeyMaterial::from_file(&path).unwrap();
        assert_eq!(keys.key.as_deref(), Some("00ff"));
        assert_eq!(keys.iv.as_deref(), Some("11ee"));
    }
}
