//! Command-line behaviour of the `swugenerator` binary

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn swugenerator() -> Command {
    Command::cargo_bin("swugenerator").unwrap()
}

fn project(template: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sw-description"), template).unwrap();
    dir
}

#[test]
fn test_help_lists_commands() {
    swugenerator()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("sign"));
}

#[test]
fn test_create_without_template_is_usage_error() {
    let dir = TempDir::new().unwrap();
    swugenerator()
        .current_dir(dir.path())
        .args(["-o", "out.swu", "create"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--sw-description"));
}

#[test]
fn test_sign_without_input_is_usage_error() {
    let dir = TempDir::new().unwrap();
    swugenerator()
        .current_dir(dir.path())
        .args(["-o", "out.swu", "sign"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--swu-input"));
}

#[test]
fn test_unknown_log_level_is_rejected() {
    swugenerator()
        .args(["-l", "verbose", "-o", "out.swu", "create"])
        .assert()
        .code(2);
}

#[test]
fn test_create_plain_archive() {
    let dir = project(r#"software = { images = ( { filename = "firmware.bin"; } ); };"#);
    let deploy = TempDir::new().unwrap();
    fs::write(deploy.path().join("firmware.bin"), b"f00d").unwrap();

    swugenerator()
        .current_dir(dir.path())
        .args(["-s", "sw-description", "-o", "out.swu", "-a"])
        .arg(deploy.path())
        .arg("create")
        .assert()
        .success();

    let bytes = fs::read(dir.path().join("out.swu")).unwrap();
    assert_eq!(&bytes[..6], b"070702");
    assert_eq!(bytes.len() % 512, 0);
}

#[test]
fn test_missing_artifact_exit_code() {
    let dir = project(r#"software = { images = ( { filename = "absent.bin"; } ); };"#);
    swugenerator()
        .current_dir(dir.path())
        .args(["-s", "sw-description", "-o", "out.swu", "create"])
        .assert()
        .code(22)
        .stderr(predicate::str::contains("absent.bin"));
}

#[test]
fn test_bad_signing_spec_exit_code() {
    let dir = project(r#"software = { version = "1"; };"#);
    swugenerator()
        .current_dir(dir.path())
        .args(["-s", "sw-description", "-o", "out.swu", "-k", "GPG,key", "create"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown signing method"));
}

#[test]
fn test_missing_key_file_exit_code() {
    let dir = project(r#"software = { version = "1"; };"#);
    swugenerator()
        .current_dir(dir.path())
        .args(["-s", "sw-description", "-o", "out.swu", "-K", "nope.key", "create"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nope.key"));
}

#[test]
fn test_variables_from_config_file() {
    let dir = project(r#"software = { version = "@@VERSION@@"; };"#);
    fs::write(dir.path().join("vars.toml"), "[variables]\nVERSION = \"3.1\"\n").unwrap();

    swugenerator()
        .current_dir(dir.path())
        .args(["-s", "sw-description", "-o", "out.swu", "-c", "vars.toml", "create"])
        .assert()
        .success();

    let bytes = fs::read(dir.path().join("out.swu")).unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("version = \"3.1\";"));
}

#[test]
fn test_sign_without_signer_repacks() {
    let dir = project(r#"software = { images = ( { filename = "firmware.bin"; } ); };"#);
    fs::write(dir.path().join("firmware.bin"), b"f00d").unwrap();

    swugenerator()
        .current_dir(dir.path())
        .args(["-s", "sw-description", "-o", "in.swu", "create"])
        .assert()
        .success();
    swugenerator()
        .current_dir(dir.path())
        .args(["-i", "in.swu", "-o", "out.swu", "sign"])
        .assert()
        .success();

    let original = fs::read(dir.path().join("in.swu")).unwrap();
    let repacked = fs::read(dir.path().join("out.swu")).unwrap();
    assert_eq!(original.len(), repacked.len());
}
