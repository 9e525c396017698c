//! Shared fixtures for integration tests
//!
//! `FakeRunner` stands in for gzip, zstd, zck, openssl and pkcs11-tool so
//! the pipelines run without any external program installed.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use swu_cpio::header::MemberHeader;
use swu_cpio::{HEADER_LEN, TRAILER_NAME};
use swu_generator::{GeneratorConfig, ToolCommand, ToolError, ToolOutput, ToolRunner};
use tempfile::TempDir;

/// Prefix written by the fake compressors
pub const COMPRESSED_PREFIX: &[u8] = b"Z:";
/// Header emitted by the fake zck
pub const ZCK_HEADER: &[u8] = b"ZCKHDR";
/// Contents of every fake signature
pub const SIGNATURE: &[u8] = b"signature";
/// Byte mask of the fake cipher
pub const CIPHER_MASK: u8 = 0xAA;

/// Bytes produced by the fake cipher
pub fn fake_encrypt(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b ^ CIPHER_MASK).collect()
}

#[derive(Default)]
pub struct FakeRunner {
    commands: Mutex<Vec<ToolCommand>>,
    /// Contents of every file handed to a signer, at signing time
    signed: Mutex<Vec<Vec<u8>>>,
}

fn value_after(args: &[String], flag: &str) -> String {
    let pos = args
        .iter()
        .position(|a| a == flag)
        .unwrap_or_else(|| panic!("missing {} in {:?}", flag, args));
    args[pos + 1].clone()
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.commands().into_iter().map(|c| c.program).collect()
    }

    pub fn signed_inputs(&self) -> Vec<Vec<u8>> {
        self.signed.lock().unwrap().clone()
    }

    fn sign(&self, input: &str, output: &str) {
        self.signed.lock().unwrap().push(fs::read(input).unwrap());
        fs::write(output, SIGNATURE).unwrap();
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        self.commands.lock().unwrap().push(command.clone());
        let args = command.arg_strings();

        match (command.program.as_str(), args.first().map(String::as_str)) {
            ("gzip", _) | ("zstd", _) => {
                let mut data = COMPRESSED_PREFIX.to_vec();
                data.extend(fs::read(args.last().unwrap()).unwrap());
                fs::write(command.stdout_path.as_ref().unwrap(), data).unwrap();
            }
            ("zck", _) => {
                let mut data = ZCK_HEADER.to_vec();
                data.extend(fs::read(args.last().unwrap()).unwrap());
                fs::write(value_after(&args, "--output"), data).unwrap();
            }
            ("zck_read_header", _) => {
                return Ok(ToolOutput {
                    stdout: format!(
                        "Overall checksum type: SHA-256\nHeader size: {}\nIndex size: 0\n",
                        ZCK_HEADER.len()
                    ),
                });
            }
            ("openssl", Some("enc")) => {
                let data = fs::read(value_after(&args, "-in")).unwrap();
                fs::write(value_after(&args, "-out"), fake_encrypt(&data)).unwrap();
            }
            ("openssl", Some("cms")) => {
                self.sign(&value_after(&args, "-in"), &value_after(&args, "-out"));
            }
            ("openssl", Some("dgst")) => {
                self.sign(args.last().unwrap(), &value_after(&args, "-out"));
            }
            ("pkcs11-tool", _) => {
                self.sign(&value_after(&args, "-i"), &value_after(&args, "-o"));
            }
            (other, _) => {
                return Err(ToolError::Failed {
                    command: command.to_string(),
                    status: "exit status: 127".to_string(),
                    stderr: format!("{}: command not found", other),
                });
            }
        }
        Ok(ToolOutput::default())
    }
}

/// One decoded archive member
pub struct Member {
    pub header: MemberHeader,
    /// Offset of the header in the archive
    pub offset: usize,
    /// Offset of the first payload byte
    pub data_offset: usize,
    pub data: Vec<u8>,
}

fn align4(pos: usize) -> usize {
    (pos + 3) & !3
}

/// Decode every member up to the trailer, checking trailer padding.
pub fn read_members(bytes: &[u8]) -> Vec<Member> {
    let mut members = Vec::new();
    let mut pos = 0;
    loop {
        pos = align4(pos);
        let fixed: &[u8; HEADER_LEN] = bytes[pos..pos + HEADER_LEN].try_into().unwrap();
        let (mut header, name_size) = MemberHeader::decode(fixed).unwrap();
        let offset = pos;
        pos += HEADER_LEN;
        let name_end = pos + name_size as usize;
        assert_eq!(bytes[name_end - 1], 0, "name must be NUL-terminated");
        header.name = String::from_utf8(bytes[pos..name_end - 1].to_vec()).unwrap();
        pos = name_end;

        if header.name == TRAILER_NAME {
            assert_eq!(header.nlink, 16);
            assert_eq!(bytes.len() % 512, 0, "archive must be padded to 512 bytes");
            assert!(bytes[pos..].iter().all(|&b| b == 0));
            break;
        }

        pos = align4(pos);
        let data_offset = pos;
        let data = bytes[pos..pos + header.file_size as usize].to_vec();
        pos += data.len();
        members.push(Member {
            header,
            offset,
            data_offset,
            data,
        });
    }
    members
}

pub fn member_names(members: &[Member]) -> Vec<&str> {
    members.iter().map(|m| m.header.name.as_str()).collect()
}

/// A project directory with a template and artifacts
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new(template: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sw-description"), template).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn artifact(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    pub fn output(&self) -> PathBuf {
        self.dir.path().join("out.swu")
    }

    pub fn config(&self) -> GeneratorConfig {
        GeneratorConfig::new(
            self.dir.path().join("sw-description"),
            self.output(),
            vec![self.dir.path().to_path_buf()],
        )
    }

    pub fn read_output(&self) -> Vec<u8> {
        fs::read(self.output()).unwrap()
    }
}
