use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn depot(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("depot").unwrap();
    cmd.arg("--url").arg(root);
    cmd
}

#[test]
fn put_cat_ls_rm_round_trip() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("store");

    depot(&root)
        .args(["put", "notes/today.txt", "--content-type", "text/plain"])
        .write_stdin("hello depot")
        .assert()
        .success()
        .stdout("11 bytes -> notes/today.txt\n");
    assert!(root.join("notes/today.txt").is_file());

    depot(&root).args(["cat", "notes/today.txt"]).assert().success().stdout("hello depot");
    depot(&root).args(["ls", "notes/"]).assert().success().stdout("notes/today.txt\n");
    depot(&root)
        .args(["ls", "-l"])
        .assert()
        .success()
        .stdout(predicate::str::contains("11  notes/today.txt"));

    depot(&root).args(["rm", "notes/today.txt"]).assert().success();
    depot(&root)
        .args(["cat", "notes/today.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("path does not exist"));
}

#[test]
fn url_of_local_object_is_a_file_url() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("store");

    depot(&root).args(["put", "a"]).write_stdin("x").assert().success();
    depot(&root)
        .args(["url", "a"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("file://").and(predicate::str::ends_with("store/a\n")));
}

#[test]
fn config_file_and_env_overrides() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("store");
    let config = tmp.path().join("depot.toml");
    std::fs::write(&config, format!("[storage]\nurl = \"{}\"\nprefix = \"from-file/\"\n", root.display())).unwrap();

    Command::cargo_bin("depot")
        .unwrap()
        .env("DEPOT__STORAGE__PREFIX", "from-env/")
        .args(["--config"])
        .arg(&config)
        .args(["put", "k"])
        .write_stdin("v")
        .assert()
        .success();

    assert!(root.join("from-env/k").is_file());
    assert!(!root.join("from-file").exists());
}

#[test]
fn remote_scheme_without_connector_fails() {
    Command::cargo_bin("depot")
        .unwrap()
        .args(["--url", "s3://bucket", "ls"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("s3://bucket"));
}

#[test]
fn missing_subcommand_prints_help() {
    Command::cargo_bin("depot").unwrap().assert().failure().stderr(predicate::str::contains("Usage"));
}
