use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn prints_version() {
    let exe = env!("CARGO_BIN_EXE_giftwrap");
    let output = Command::new(exe)
        .arg("--version")
        .output()
        .expect("run giftwrap --version");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "stdout was: {}",
        stdout.trim()
    );
}

#[test]
fn prints_help() {
    let exe = env!("CARGO_BIN_EXE_giftwrap");
    let output = Command::new(exe)
        .arg("--help")
        .output()
        .expect("run giftwrap --help");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    assert!(stdout.contains("Giftwrap"));
    assert!(stdout.contains("--version"));
    assert!(stdout.contains("--check-catalog"));
}

#[test]
fn checks_a_valid_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gifts.yaml");
    fs::write(
        &path,
        "gifts:\n  - id: one\n    kind: video\n    media: /clips/one.mp4\n",
    )
    .unwrap();

    Command::cargo_bin("giftwrap")
        .unwrap()
        .arg("--check-catalog")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Catalog OK: 1 gift(s)"));
}

#[test]
fn rejects_an_invalid_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gifts.yaml");
    fs::write(&path, "gifts:\n  - id: ''\n    media: /clips/one.mp4\n").unwrap();

    Command::cargo_bin("giftwrap")
        .unwrap()
        .arg("--check-catalog")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Catalog check failed"));
}
