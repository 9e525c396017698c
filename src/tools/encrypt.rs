//! AES-256-CBC encryption command lines

use std::path::Path;

use rand::rngs::OsRng;
use rand::RngCore;

use super::ToolCommand;

/// Initialization vector length in bytes
pub const IV_LEN: usize = 16;

/// Command encrypting `input` into `output` with a hex key and IV.
pub fn encrypt_command(input: &Path, output: &Path, key: &str, iv: &str) -> ToolCommand {
    ToolCommand::new("openssl")
        .args(["enc", "-aes-256-cbc", "-in"])
        .arg(input)
        .arg("-out")
        .arg(output)
        .args(["-K", key, "-iv", iv, "-nosalt"])
}

/// Fresh random IV, as 32 lowercase hex characters.
pub fn generate_iv() -> String {
    let mut bytes = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
