//! Artifacts
//!
//! An artifact is one file referenced by the descriptor. It is found in the
//! search directories, then possibly replaced by transformed copies
//! (compressed, delta header, encrypted) living in the scratch directory.
//! The source name never changes; the output name gains one suffix per
//! transform.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::tools::{encrypt_command, ToolError, ToolRunner};

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Artifact errors
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact {name} not found in {searched} search directories")]
    NotFound { name: String, searched: usize },

    #[error("cannot read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One file referenced by the descriptor
#[derive(Debug, Clone)]
pub struct Artifact {
    source_name: String,
    output_name: String,
    path: PathBuf,
    exists: bool,
    sha256: String,
    ivt: Option<String>,
    size: u64,
}

impl Artifact {
    /// Create an unresolved artifact for `name`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            output_name: name.clone(),
            path: PathBuf::from(&name),
            source_name: name,
            exists: false,
            sha256: String::new(),
            ivt: None,
            size: 0,
        }
    }

    /// Find the file in the first directory that contains it.
    ///
    /// Records the resolved path, size and content hash.
    pub fn resolve(&mut self, dirs: &[PathBuf]) -> Result<(), ArtifactError> {
        let found = dirs
            .iter()
            .map(|dir| dir.join(&self.source_name))
            .find(|candidate| candidate.exists());

        let Some(path) = found else {
            return Err(ArtifactError::NotFound {
                name: self.source_name.clone(),
                searched: dirs.len(),
            });
        };

        debug!(artifact = %self.source_name, path = %path.display(), "resolved artifact");
        self.size = fs::metadata(&path)
            .map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?
            .len();
        self.path = path;
        self.exists = true;
        self.compute_hash()?;
        Ok(())
    }

    /// Hash whatever currently backs the artifact.
    pub fn compute_hash(&mut self) -> Result<&str, ArtifactError> {
        self.sha256 = sha256_file(&self.path).map_err(|source| ArtifactError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(&self.sha256)
    }

    /// Encrypt the backing file into `dest`.
    ///
    /// The artifact keeps pointing at its current file; callers repoint it.
    pub fn encrypt(
        &self,
        runner: &dyn ToolRunner,
        dest: &Path,
        key: &str,
        iv: &str,
    ) -> Result<(), ToolError> {
        runner.run(&encrypt_command(&self.path, dest, key, iv))?;
        Ok(())
    }

    /// Name the artifact was referenced by
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Name written back into the descriptor
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Append `.<suffix>` to the output name
    pub fn push_suffix(&mut self, suffix: &str) {
        self.output_name.push('.');
        self.output_name.push_str(suffix);
    }

    /// File currently backing the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point the artifact at a new backing file
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    /// Whether the artifact was found in a search directory
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Last computed content hash, lowercase hex (empty before hashing)
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// IV used to encrypt the artifact, if encrypted
    pub fn ivt(&self) -> Option<&str> {
        self.ivt.as_deref()
    }

    pub fn set_ivt(&mut self, iv: String) {
        self.ivt = Some(iv);
    }

    /// Size of the source file in bytes
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// SHA-256 of a file, as 64 lowercase hex characters.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_sha256_file() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty");
        let abc = dir.path().join("abc");
        fs::write(&empty, b"").unwrap();
        fs::write(&abc, b"abc").unwrap();

        assert_eq!(sha256_file(&empty).unwrap(), EMPTY_SHA256);
        assert_eq!(sha256_file(&abc).unwrap(), ABC_SHA256);
    }

    #[test]
    fn test_resolve_first_directory_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("fw.bin"), b"second").unwrap();
        fs::write(first.path().join("fw.bin"), b"abc").unwrap();

        let mut artifact = Artifact::new("fw.bin");
        artifact
            .resolve(&[first.path().to_path_buf(), second.path().to_path_buf()])
            .unwrap();

        assert!(artifact.exists());
        assert_eq!(artifact.path(), first.path().join("fw.bin"));
        assert_eq!(artifact.size(), 3);
        assert_eq!(artifact.sha256(), ABC_SHA256);
    }

    #[test]
    fn test_resolve_falls_through() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("fw.bin"), b"abc").unwrap();

        let mut artifact = Artifact::new("fw.bin");
        artifact
            .resolve(&[first.path().to_path_buf(), second.path().to_path_buf()])
            .unwrap();
        assert_eq!(artifact.path(), second.path().join("fw.bin"));
    }

    #[test]
    fn test_resolve_not_found() {
        let dir = TempDir::new().unwrap();
        let mut artifact = Artifact::new("missing.bin");
        let err = artifact.resolve(&[dir.path().to_path_buf()]).unwrap_err();
        match err {
            ArtifactError::NotFound { name, searched } => {
                assert_eq!(name, "missing.bin");
                assert_eq!(searched, 1);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert!(!artifact.exists());
    }

    #[test]
    fn test_output_name_accumulates_suffixes() {
        let mut artifact = Artifact::new("rootfs.ext4");
        artifact.push_suffix("zlib");
        artifact.push_suffix("enc");
        assert_eq!(artifact.output_name(), "rootfs.ext4.zlib.enc");
        assert_eq!(artifact.source_name(), "rootfs.ext4");
    }

    #[test]
    fn test_compute_hash_follows_backing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a"), b"abc").unwrap();
        fs::write(dir.path().join("b"), b"").unwrap();

        let mut artifact = Artifact::new("a");
        artifact.resolve(&[dir.path().to_path_buf()]).unwrap();
        artifact.set_path(dir.path().join("b"));
        assert_eq!(artifact.compute_hash().unwrap(), EMPTY_SHA256);
        assert_eq!(artifact.size(), 3);
    }
}
