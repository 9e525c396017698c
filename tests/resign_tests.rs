//! Re-signing existing archives

mod common;

use common::{member_names, read_members, FakeRunner, Project, SIGNATURE};
use swu_generator::{Generator, ResignConfig, Resigner, SignRequest};

fn build_archive(project: &Project, signer: Option<&str>) {
    project.artifact("rootfs.ext4", b"rootfs");
    project.artifact("uImage", b"kernel");
    let mut config = project.config();
    config.signer = signer.map(|s| SignRequest::parse(s).unwrap());

    let runner = FakeRunner::new();
    let mut generator = Generator::new(config, &runner).unwrap();
    generator.process().unwrap();
    generator.close().unwrap();
}

fn project() -> Project {
    Project::new(
        r#"software = { images = ( { filename = "rootfs.ext4"; }, { filename = "uImage"; } ); };"#,
    )
}

#[test]
fn test_resign_inserts_signature_after_manifest() {
    let project = project();
    build_archive(&project, None);
    let resigned = project.path().join("signed.swu");
    let runner = FakeRunner::new();

    let mut resigner = Resigner::new(
        ResignConfig {
            input: project.output(),
            output: resigned.clone(),
            signer: Some(SignRequest::parse("PKCS11,1234").unwrap()),
        },
        &runner,
    )
    .unwrap();
    let names = resigner.process().unwrap();
    resigner.close().unwrap();

    assert_eq!(
        names,
        vec!["sw-description", "sw-description.sig", "rootfs.ext4", "uImage"]
    );

    let original = read_members(&project.read_output());
    let bytes = std::fs::read(&resigned).unwrap();
    let members = read_members(&bytes);
    assert_eq!(
        member_names(&members),
        vec!["sw-description", "sw-description.sig", "rootfs.ext4", "uImage"]
    );
    assert_eq!(members[0].data, original[0].data);
    assert_eq!(members[1].data, SIGNATURE);
    assert_eq!(members[2].data, b"rootfs");
    assert_eq!(members[3].data, b"kernel");
    for (i, member) in members.iter().enumerate() {
        assert_eq!(member.header.inode, i as u64 + 1);
    }

    assert_eq!(runner.signed_inputs(), vec![original[0].data.clone()]);
}

#[test]
fn test_resign_signed_archive_replaces_signature() {
    let project = project();
    build_archive(&project, Some("RSA,old.pem"));
    let resigned = project.path().join("resigned.swu");

    let mut resigner = Resigner::new(
        ResignConfig {
            input: project.output(),
            output: resigned.clone(),
            signer: Some(SignRequest::parse("CMS,new.pem,new.crt").unwrap()),
        },
        FakeRunner::new(),
    )
    .unwrap();
    let names = resigner.process().unwrap();
    resigner.close().unwrap();

    assert_eq!(names.iter().filter(|n| *n == "sw-description.sig").count(), 1);
    let members = read_members(&std::fs::read(&resigned).unwrap());
    assert_eq!(
        member_names(&members),
        vec!["sw-description", "sw-description.sig", "rootfs.ext4", "uImage"]
    );
}

#[test]
fn test_repack_without_signer() {
    let project = project();
    build_archive(&project, None);
    let repacked = project.path().join("repacked.swu");
    let runner = FakeRunner::new();

    let mut resigner = Resigner::new(
        ResignConfig {
            input: project.output(),
            output: repacked.clone(),
            signer: None,
        },
        &runner,
    )
    .unwrap();
    resigner.process().unwrap();
    resigner.close().unwrap();

    assert!(runner.commands().is_empty());
    let original = read_members(&project.read_output());
    let members = read_members(&std::fs::read(&repacked).unwrap());
    assert_eq!(member_names(&members), member_names(&original));
    for (a, b) in members.iter().zip(&original) {
        assert_eq!(a.data, b.data);
        assert_eq!(a.header.checksum, b.header.checksum);
    }
}

#[test]
fn test_corrupt_input_is_rejected() {
    let project = project();
    build_archive(&project, None);

    let mut bytes = project.read_output();
    let members = read_members(&bytes);
    bytes[members[1].data_offset] ^= 0xFF;
    let corrupt = project.path().join("corrupt.swu");
    std::fs::write(&corrupt, &bytes).unwrap();

    let mut resigner = Resigner::new(
        ResignConfig {
            input: corrupt,
            output: project.path().join("never.swu"),
            signer: None,
        },
        FakeRunner::new(),
    )
    .unwrap();
    let err = resigner.process().unwrap_err();
    assert!(err.to_string().contains("archive error"));
    assert_eq!(err.exit_code(), 1);
}
