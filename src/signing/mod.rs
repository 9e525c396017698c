//! Manifest signing requests
//!
//! A signer is chosen on the command line as a comma-separated spec:
//! - `CMS,<key>,<cert>[,<passfile>[,<certfile>[,<engine>[,<keyform>]]]]`
//! - `RSA,<key>[,<passfile>]`
//! - `PKCS11,<pin>[,<module>]`
//! - `CUSTOM,<command line>`
//!
//! Each request turns into exactly one external command producing a
//! detached signature.

use std::path::Path;

use crate::tools::ToolCommand;

/// Signing request errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignError {
    #[error("empty signing spec")]
    Empty,

    #[error("unknown signing method: {0}")]
    UnknownMethod(String),

    #[error("{method} requires {what}")]
    MissingParameter {
        method: &'static str,
        what: &'static str,
    },
}

/// How the manifest gets signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignRequest {
    Cms {
        key: String,
        cert: String,
        password_file: Option<String>,
        certs_file: Option<String>,
        engine: Option<String>,
        keyform: Option<String>,
    },
    Rsa {
        key: String,
        password_file: Option<String>,
    },
    Pkcs11 {
        pin: String,
        module: Option<String>,
    },
    Custom {
        program: String,
        args: Vec<String>,
    },
}

impl SignRequest {
    /// Parse a command-line signing spec.
    pub fn parse(spec: &str) -> Result<Self, SignError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(SignError::Empty);
        }
        let (method, rest) = spec.split_once(',').unwrap_or((spec, ""));

        match method {
            "CMS" => {
                let mut parts = rest.split(',').map(optional);
                let key = parts.next().flatten().ok_or(SignError::MissingParameter {
                    method: "CMS",
                    what: "a private key",
                })?;
                let cert = parts.next().flatten().ok_or(SignError::MissingParameter {
                    method: "CMS",
                    what: "a certificate",
                })?;
                Ok(SignRequest::Cms {
                    key,
                    cert,
                    password_file: parts.next().flatten(),
                    certs_file: parts.next().flatten(),
                    engine: parts.next().flatten(),
                    keyform: parts.next().flatten(),
                })
            }
            "RSA" => {
                let mut parts = rest.split(',').map(optional);
                let key = parts.next().flatten().ok_or(SignError::MissingParameter {
                    method: "RSA",
                    what: "a private key",
                })?;
                Ok(SignRequest::Rsa {
                    key,
                    password_file: parts.next().flatten(),
                })
            }
            "PKCS11" => {
                let mut parts = rest.split(',').map(optional);
                let pin = parts.next().flatten().ok_or(SignError::MissingParameter {
                    method: "PKCS11",
                    what: "a PIN",
                })?;
                Ok(SignRequest::Pkcs11 {
                    pin,
                    module: parts.next().flatten(),
                })
            }
            "CUSTOM" => {
                let mut tokens = rest.split_whitespace().map(String::from);
                let program = tokens.next().ok_or(SignError::MissingParameter {
                    method: "CUSTOM",
                    what: "a command",
                })?;
                Ok(SignRequest::Custom {
                    program,
                    args: tokens.collect(),
                })
            }
            other => Err(SignError::UnknownMethod(other.to_string())),
        }
    }

    /// Method name as written in the spec
    pub fn method(&self) -> &'static str {
        match self {
            SignRequest::Cms { .. } => "CMS",
            SignRequest::Rsa { .. } => "RSA",
            SignRequest::Pkcs11 { .. } => "PKCS11",
            SignRequest::Custom { .. } => "CUSTOM",
        }
    }

    /// Command signing `input` into the detached signature `output`.
    ///
    /// Custom commands are used verbatim and receive neither path.
    pub fn build_command(&self, input: &Path, output: &Path) -> ToolCommand {
        match self {
            SignRequest::Cms {
                key,
                cert,
                password_file,
                certs_file,
                engine,
                keyform,
            } => {
                let mut cmd = ToolCommand::new("openssl")
                    .args(["cms", "-sign", "-in"])
                    .arg(input)
                    .arg("-out")
                    .arg(output)
                    .args(["-signer", cert.as_str(), "-inkey", key.as_str()])
                    .args(["-outform", "DER", "-nosmimecap", "-binary"]);
                if let Some(pass) = password_file {
                    cmd = cmd.arg("-passin").arg(format!("file:{}", pass));
                }
                if let Some(certs) = certs_file {
                    cmd = cmd.arg("-certfile").arg(certs);
                }
                if let Some(engine) = engine {
                    cmd = cmd.arg("-engine").arg(engine);
                }
                if let Some(keyform) = keyform {
                    cmd = cmd.arg("-keyform").arg(keyform);
                }
                cmd
            }
            SignRequest::Rsa { key, password_file } => {
                let mut cmd =
                    ToolCommand::new("openssl").args(["dgst", "-sha256", "-sign", key.as_str()]);
                if let Some(pass) = password_file {
                    cmd = cmd.arg("-passin").arg(format!("file:{}", pass));
                }
                cmd.arg("-out").arg(output).arg(input)
            }
            SignRequest::Pkcs11 { pin, module } => {
                let mut cmd = ToolCommand::new("pkcs11-tool")
                    .args(["-s", "-m", "SHA256-RSA-PKCS", "-i"])
                    .arg(input)
                    .arg("-o")
                    .arg(output)
                    .args(["--pin", pin.as_str()]);
                if let Some(module) = module {
                    cmd = cmd.arg("--module").arg(module);
                }
                cmd
            }
            SignRequest::Custom { program, args } => {
                ToolCommand::new(program.as_str()).args(args)
            }
        }
    }
}

fn optional(part: &str) -> Option<String> {
    let part = part.trim();
    if part.is_empty() {
        None
    } else {
        Some(part.to_string())
    }
}
