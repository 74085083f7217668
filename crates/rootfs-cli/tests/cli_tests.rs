//! Integration tests for rootfs-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use flate2::Compression;
use flate2::write::GzEncoder;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

const MANIFEST: &str = r#"{"acKind":"ImageManifest","name":"example.com/busybox"}"#;

fn rootfs_cmd() -> Command {
    cargo_bin_cmd!("rootfs")
}

fn header(kind: tar::EntryType, mode: u32, size: usize) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_size(size as u64);
    header.set_uid(u64::from(rustix::process::geteuid().as_raw()));
    header.set_gid(u64::from(rustix::process::getegid().as_raw()));
    header.set_mtime(1_600_000_000);
    header
}

/// Builds a small image: a manifest plus a rootfs with a file, a symlink
/// and a hard link.
fn image_tar() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());

    let mut h = header(tar::EntryType::Regular, 0o644, MANIFEST.len());
    builder
        .append_data(&mut h, "manifest", MANIFEST.as_bytes())
        .unwrap();

    for dir in ["rootfs", "rootfs/etc", "rootfs/bin"] {
        let mut h = header(tar::EntryType::Directory, 0o755, 0);
        builder.append_data(&mut h, dir, std::io::empty()).unwrap();
    }

    let hosts = b"127.0.0.1 localhost\n";
    let mut h = header(tar::EntryType::Regular, 0o640, hosts.len());
    builder
        .append_data(&mut h, "rootfs/etc/hosts", &hosts[..])
        .unwrap();

    let busybox = b"\x7fELF";
    let mut h = header(tar::EntryType::Regular, 0o755, busybox.len());
    builder
        .append_data(&mut h, "rootfs/bin/busybox", &busybox[..])
        .unwrap();

    let mut h = header(tar::EntryType::Symlink, 0o777, 0);
    builder
        .append_link(&mut h, "rootfs/bin/sh", "busybox")
        .unwrap();

    let mut h = header(tar::EntryType::Link, 0o755, 0);
    builder
        .append_link(&mut h, "rootfs/bin/ls", "rootfs/bin/busybox")
        .unwrap();

    builder.into_inner().unwrap()
}

fn write_archive(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn test_version_flag() {
    rootfs_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rootfs"));
}

#[test]
fn test_help_flag() {
    rootfs_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("cat"));
}

#[test]
fn test_extract_help() {
    rootfs_cmd()
        .args(["extract", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--uid-range"))
        .stdout(predicate::str::contains("--defer-hardlinks"));
}

#[test]
fn test_extract_image() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = write_archive(temp.path(), "image.aci", &image_tar());
    let root = temp.path().join("pod");

    rootfs_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Extraction complete"));

    assert_eq!(fs::read_to_string(root.join("manifest")).unwrap(), MANIFEST);
    assert_eq!(
        fs::read_to_string(root.join("rootfs/etc/hosts")).unwrap(),
        "127.0.0.1 localhost\n"
    );
    let mode = fs::metadata(root.join("rootfs/etc/hosts"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o7777, 0o640);
    assert_eq!(
        fs::read_link(root.join("rootfs/bin/sh")).unwrap(),
        PathBuf::from("busybox")
    );
    let ino = |p: &str| fs::metadata(root.join(p)).unwrap().ino();
    assert_eq!(ino("rootfs/bin/ls"), ino("rootfs/bin/busybox"));
}

#[test]
fn test_extract_gzip_image() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "image.aci", &gzip(&image_tar()));
    let root = temp.path().join("pod");

    rootfs_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&root)
        .assert()
        .success();

    assert!(root.join("rootfs/bin/busybox").is_file());
}

#[test]
fn test_extract_only_selected_paths() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "image.aci", &image_tar());
    let root = temp.path().join("pod");

    rootfs_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&root)
        .args(["--only", "manifest", "--only", "/rootfs/etc/hosts"])
        .assert()
        .success();

    assert!(root.join("manifest").is_file());
    assert!(root.join("rootfs/etc/hosts").is_file());
    assert!(!root.join("rootfs/bin").exists());
}

#[test]
fn test_extract_existing_file_without_overwrite_truncates() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "image.aci", &image_tar());
    let root = temp.path().join("pod");
    fs::create_dir_all(root.join("rootfs/etc")).unwrap();
    fs::write(root.join("rootfs/etc/hosts"), "a much longer previous content\n").unwrap();

    rootfs_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&root)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(root.join("rootfs/etc/hosts")).unwrap(),
        "127.0.0.1 localhost\n"
    );
}

#[test]
fn test_extract_json_output() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "image.aci", &image_tar());
    let root = temp.path().join("pod");

    let output = rootfs_cmd()
        .arg("--json")
        .arg("extract")
        .arg(&archive)
        .arg(&root)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["operation"], "extract");
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["files_extracted"], 3);
    assert_eq!(json["data"]["directories_created"], 3);
    assert_eq!(json["data"]["symlinks_created"], 1);
    assert_eq!(json["data"]["hardlinks_created"], 1);
}

#[test]
fn test_extract_quiet_prints_nothing() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "image.aci", &image_tar());

    rootfs_cmd()
        .arg("--quiet")
        .arg("extract")
        .arg(&archive)
        .arg(temp.path().join("pod"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_extract_reversed_hardlink_needs_defer() {
    let temp = TempDir::new().unwrap();

    let mut builder = tar::Builder::new(Vec::new());
    let mut h = header(tar::EntryType::Link, 0o644, 0);
    builder.append_link(&mut h, "ls", "busybox").unwrap();
    let mut h = header(tar::EntryType::Regular, 0o755, 2);
    builder.append_data(&mut h, "busybox", &b"bb"[..]).unwrap();
    let archive = write_archive(temp.path(), "links.tar", &builder.into_inner().unwrap());

    rootfs_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(temp.path().join("strict"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--defer-hardlinks"));

    let deferred = temp.path().join("deferred");
    rootfs_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&deferred)
        .arg("--defer-hardlinks")
        .assert()
        .success();

    assert_eq!(fs::read(deferred.join("ls")).unwrap(), b"bb");
}

#[test]
fn test_extract_missing_archive() {
    let temp = TempDir::new().unwrap();

    rootfs_cmd()
        .arg("extract")
        .arg(temp.path().join("nope.aci"))
        .arg(temp.path().join("pod"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.aci"));
}

#[test]
fn test_extract_invalid_uid_range() {
    let temp = TempDir::new().unwrap();

    rootfs_cmd()
        .arg("extract")
        .arg(temp.path().join("image.aci"))
        .arg(temp.path().join("pod"))
        .args(["--uid-range", "many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_cat_manifest() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "image.aci", &gzip(&image_tar()));

    rootfs_cmd()
        .arg("cat")
        .arg(&archive)
        .arg("./manifest")
        .assert()
        .success()
        .stdout(predicate::str::diff(MANIFEST));
}

#[test]
fn test_cat_missing_file() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "image.aci", &image_tar());

    rootfs_cmd()
        .arg("cat")
        .arg(&archive)
        .arg("rootfs/etc/shadow")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"))
        .stderr(predicate::str::contains("HINT"));
}

#[test]
fn test_cat_directory_is_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "image.aci", &image_tar());

    rootfs_cmd()
        .arg("cat")
        .arg(&archive)
        .arg("rootfs/etc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a regular file"));
}

#[test]
fn test_completion_bash() {
    rootfs_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rootfs"));
}

#[test]
fn test_no_args_shows_usage() {
    rootfs_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
