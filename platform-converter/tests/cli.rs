//! CLI integration tests
//!
//! These run the built binary end to end against synthesised bundles.

mod common;

use assert_cmd::Command;
use common::{Workspace, class_package_path, read_assets, write_sample};
use predicates::prelude::*;
use tempfile::TempDir;

fn converter() -> Command {
    let mut cmd = Command::cargo_bin("unity-platform-converter").unwrap();
    cmd.env_remove("UNITY_CLASS_PACKAGE")
        .env_remove("UNITY_STAGING_DIR")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_single_file_conversion() {
    let dir = TempDir::new().unwrap();
    let input = write_sample(dir.path(), "in.bundle", 5);
    let output = dir.path().join("out.bundle");

    converter()
        .args(["--platform", "android", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--class-package")
        .arg(class_package_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted in.bundle"))
        .stdout(predicate::str::contains("all complete"));

    assert_eq!(read_assets(&output).target_platform(), 13);
}

#[test]
fn test_directory_mode_with_skip() {
    let ws = Workspace::new();
    ws.add_bundles(3, 5);
    ws.add_corrupt("broken.unity3d");

    converter()
        .args(["-p", "20", "-d", "-t", "2", "-i"])
        .arg(&ws.input)
        .arg("-o")
        .arg(&ws.output)
        .arg("--staging-dir")
        .arg(&ws.staging)
        .env("UNITY_CLASS_PACKAGE", class_package_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped broken.unity3d"))
        .stdout(predicate::str::contains("completed with 1 skipped"));

    assert_eq!(ws.output_names().len(), 3);
    assert!(ws.staging_is_empty());
}

#[test]
fn test_silent_prints_nothing() {
    let ws = Workspace::new();
    ws.add_bundles(2, 5);

    converter()
        .args(["-p", "13", "-d", "--silent", "-i"])
        .arg(&ws.input)
        .arg("-o")
        .arg(&ws.output)
        .arg("--class-package")
        .arg(class_package_path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(ws.output_names().len(), 2);
}

#[test]
fn test_class_package_found_in_working_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::copy(class_package_path(), dir.path().join("classdata.yaml")).unwrap();
    write_sample(dir.path(), "in.bundle", 5);

    converter()
        .current_dir(dir.path())
        .args(["-p", "13", "-i", "in.bundle", "-o", "out.bundle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("all complete"));

    assert_eq!(read_assets(&dir.path().join("out.bundle")).target_platform(), 13);
}

#[test]
fn test_no_class_package_anywhere_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_sample(dir.path(), "in.bundle", 5);

    converter()
        .current_dir(dir.path())
        .args(["-p", "13", "-i", "in.bundle", "-o", "out.bundle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load class package"));

    assert!(!dir.path().join("out.bundle").exists());
}

#[test]
fn test_missing_class_package_is_fatal() {
    let dir = TempDir::new().unwrap();
    let input = write_sample(dir.path(), "in.bundle", 5);
    let output = dir.path().join("out.bundle");

    converter()
        .args(["-p", "13", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--class-package")
        .arg(dir.path().join("classdata.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load class package"));

    assert!(!output.exists());
}

#[test]
fn test_unknown_platform_name_rejected() {
    converter()
        .args(["-p", "gamecube", "-i", "a", "-o", "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown platform"));
}
