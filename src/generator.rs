//! Archive generation
//!
//! Builds an SWU from a sw-description template:
//! 1. expand variables and functions, parse the descriptor
//! 2. process every file reference below `software` (resolve, compress
//!    or delta, encrypt, hash) and rewrite the entry
//! 3. serialize the manifest, sign it, optionally encrypt it
//! 4. write manifest, signature and artifacts into the archive
//!
//! Each source file is processed once; later references reuse the result.
//! Intermediate files live in a scratch directory removed on close.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use swu_cpio::ArchiveWriter;
use swu_libconf::{Group, Node};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::artifact::Artifact;
use crate::config::GeneratorConfig;
use crate::descriptor::{expand_functions, expand_variables, Descriptor, MANIFEST_NAME};
use crate::error::{GeneratorError, Result};
use crate::tools::{
    copy_header, encrypt_command, generate_iv, parse_header_size, zck_command,
    zck_header_command, Compression, SystemRunner, ToolError, ToolRunner, DELTA_TYPE,
};

/// Suffix added to encrypted artifacts
const ENCRYPTED_SUFFIX: &str = "enc";

/// Builds one SWU archive
pub struct Generator<R: ToolRunner = SystemRunner> {
    config: GeneratorConfig,
    runner: R,
    scratch: TempDir,
    writer: ArchiveWriter<BufWriter<File>>,
    artifacts: Vec<Artifact>,
    by_source: HashMap<String, usize>,
}

impl<R: ToolRunner> Generator<R> {
    /// Create the output file and the scratch directory.
    pub fn new(config: GeneratorConfig, runner: R) -> Result<Self> {
        let file = File::create(&config.output).map_err(|e| {
            GeneratorError::Config(format!("cannot create {}: {}", config.output.display(), e))
        })?;
        let scratch = TempDir::new()?;
        debug!(scratch = %scratch.path().display(), "created scratch directory");

        Ok(Self {
            config,
            runner,
            scratch,
            writer: ArchiveWriter::new(BufWriter::new(file)),
            artifacts: Vec::new(),
            by_source: HashMap::new(),
        })
    }

    /// Artifacts in first-reference order
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Process the template and write all members.
    pub fn process(&mut self) -> Result<()> {
        info!(template = %self.config.sw_description.display(), "processing sw-description");
        let text = self.render_template()?;
        let mut descriptor = Descriptor::parse(&text)?;

        let references = descriptor.file_references().ok_or_else(|| {
            GeneratorError::Config("sw-description has no `software` group".to_string())
        })?;
        debug!(count = references.len(), "found file references");

        for path in &references {
            let entry = descriptor.entry_mut(path).ok_or_else(|| {
                GeneratorError::Config(format!("file reference {} disappeared", path))
            })?;
            self.process_entry(entry)?;
        }

        let (manifest, signature) = self.write_manifest(&descriptor)?;
        self.writer.write_member(&manifest)?;
        if let Some(ref signature) = signature {
            self.writer.write_member(signature)?;
        }
        for artifact in &self.artifacts {
            debug!(member = %artifact.output_name(), "adding artifact");
            self.writer.write_member(artifact.path())?;
        }

        info!(
            output = %self.config.output.display(),
            artifacts = self.artifacts.len(),
            signed = signature.is_some(),
            "archive written"
        );
        Ok(())
    }

    /// Write the trailer and remove the scratch directory.
    pub fn close(self) -> Result<()> {
        let Generator {
            mut writer,
            scratch,
            ..
        } = self;
        writer.finish()?;
        drop(writer);
        scratch.close()?;
        Ok(())
    }

    fn render_template(&self) -> Result<String> {
        let path = &self.config.sw_description;
        let raw = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let text = expand_variables(&raw, &self.config.variables)?;
        Ok(expand_functions(&text, &self.config.artifact_dirs)?)
    }

    fn process_entry(&mut self, entry: &mut Group) -> Result<()> {
        let source = entry
            .get_str("filename")
            .ok_or_else(|| GeneratorError::Config("`filename` must be a string".to_string()))?
            .to_string();

        let index = match self.by_source.get(&source) {
            Some(&index) => {
                debug!(artifact = %source, "artifact already stored");
                index
            }
            None => {
                debug!(artifact = %source, "new artifact");
                let artifact = self.prepare_artifact(&source, entry)?;
                self.artifacts.push(artifact);
                self.by_source.insert(source, self.artifacts.len() - 1);
                self.artifacts.len() - 1
            }
        };

        let artifact = &self.artifacts[index];
        entry.insert("filename", artifact.output_name());
        if !self.config.flags.no_hash {
            entry.insert("sha256", artifact.sha256());
        }
        if entry.get_bool("encrypted") == Some(true) {
            if let Some(iv) = artifact.ivt() {
                entry.insert("ivt", iv);
            }
        }
        Ok(())
    }

    fn prepare_artifact(&self, source: &str, entry: &Group) -> Result<Artifact> {
        let flags = self.config.flags;
        let mut artifact = Artifact::new(source);
        artifact.resolve(&self.config.artifact_dirs)?;

        match entry.get("compressed") {
            Some(setting) if !flags.no_compress => {
                let algorithm = setting
                    .as_str()
                    .and_then(Compression::from_name)
                    .ok_or_else(|| {
                        GeneratorError::Config(format!(
                            "wrong compression algorithm for {}: {}",
                            source,
                            describe(setting)
                        ))
                    })?;
                self.compress(&mut artifact, algorithm)?;
            }
            _ if entry.get_str("type") == Some(DELTA_TYPE) => self.delta(&mut artifact)?,
            _ => {}
        }

        if entry.get_bool("encrypted") == Some(true) && !flags.no_encrypt {
            self.encrypt(&mut artifact)?;
        }

        if !flags.no_hash {
            artifact.compute_hash()?;
        }
        Ok(artifact)
    }

    fn compress(&self, artifact: &mut Artifact, algorithm: Compression) -> Result<()> {
        let output = self.scratch_path(&format!(
            "{}.{}",
            artifact.output_name(),
            algorithm.name()
        ))?;
        debug!(artifact = %artifact.source_name(), algorithm = algorithm.name(), "compressing");
        self.runner
            .run(&algorithm.command(artifact.path(), &output))?;
        artifact.push_suffix(algorithm.name());
        artifact.set_path(output);
        Ok(())
    }

    fn delta(&self, artifact: &mut Artifact) -> Result<()> {
        let zck = self.scratch_path(&format!("{}.zck", artifact.output_name()))?;
        debug!(artifact = %artifact.source_name(), "creating zchunk delta");
        self.runner.run(&zck_command(artifact.path(), &zck))?;

        let header_command = zck_header_command(&zck);
        let report = self.runner.run(&header_command)?;
        let size = parse_header_size(&report.stdout).ok_or_else(|| ToolError::Output {
            command: header_command.to_string(),
            message: "no `Header size` in report".to_string(),
        })?;

        let header = self.scratch_path(artifact.output_name())?;
        copy_header(&zck, &header, size)?;
        artifact.set_path(header);
        Ok(())
    }

    fn encrypt(&self, artifact: &mut Artifact) -> Result<()> {
        let keys = &self.config.keys;
        let key = keys.key.as_deref().ok_or_else(|| {
            GeneratorError::Config(format!(
                "{} must be encrypted, but no encryption key is given",
                artifact.source_name()
            ))
        })?;
        let iv = if self.config.flags.no_ivt {
            keys.iv.clone().ok_or_else(|| {
                GeneratorError::Config(format!(
                    "{} must be encrypted, but no initialization vector is given",
                    artifact.source_name()
                ))
            })?
        } else {
            generate_iv()
        };

        artifact.push_suffix(ENCRYPTED_SUFFIX);
        let dest = self.scratch_path(artifact.output_name())?;
        debug!(artifact = %artifact.source_name(), "encrypting");
        artifact.encrypt(&self.runner, &dest, key, &iv)?;
        artifact.set_path(dest);
        artifact.set_ivt(iv);
        Ok(())
    }

    /// Serialize, sign and optionally encrypt the manifest.
    ///
    /// The signature always covers the plaintext.
    fn write_manifest(&self, descriptor: &Descriptor) -> Result<(PathBuf, Option<PathBuf>)> {
        let manifest = self.scratch.path().join(MANIFEST_NAME);
        fs::write(&manifest, descriptor.to_text())?;

        let signature = match self.config.signer {
            Some(ref signer) => {
                let signature = self.scratch.path().join(format!("{}.sig", MANIFEST_NAME));
                info!(method = signer.method(), "signing sw-description");
                self.runner
                    .run(&signer.build_command(&manifest, &signature))?;
                Some(signature)
            }
            None => None,
        };

        if self.config.encrypt_manifest {
            self.encrypt_manifest(&manifest)?;
        }
        Ok((manifest, signature))
    }

    fn encrypt_manifest(&self, manifest: &Path) -> Result<()> {
        let keys = &self.config.keys;
        let (Some(key), Some(iv)) = (keys.key.as_deref(), keys.iv.as_deref()) else {
            return Err(GeneratorError::Config(
                "sw-description must be encrypted, but key or initialization vector is missing"
                    .to_string(),
            ));
        };

        let encrypted = manifest.with_extension("enc");
        info!("encrypting sw-description");
        self.runner
            .run(&encrypt_command(manifest, &encrypted, key, iv))?;
        fs::rename(&encrypted, manifest)?;
        Ok(())
    }

    /// Path below the scratch directory, with parent directories created
    fn scratch_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.scratch.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

fn describe(node: &Node) -> String {
    match node {
        Node::Scalar(scalar) => scalar.to_string(),
        Node::Mapping(_) => "<group>".to_string(),
        Node::Sequence(_) => "<list>".to_string(),
    }
}
