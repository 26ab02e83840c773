use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary with its home pointed at a scratch directory.
fn gameboard() -> (TempDir, Command) {
    let home = tempfile::tempdir().expect("temp home");
    let mut cmd = Command::cargo_bin("gameboard").expect("gameboard binary");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("XDG_CACHE_HOME", home.path().join(".cache"));
    (home, cmd)
}

#[test]
fn prints_version() {
    let (_home, mut cmd) = gameboard();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    let (_home, mut cmd) = gameboard();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Gameboard"))
        .stdout(predicate::str::contains("--set-server"))
        .stdout(predicate::str::contains("--logout"));
}

#[test]
fn logout_without_a_session_is_harmless() {
    let (_home, mut cmd) = gameboard();
    cmd.arg("--logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("No stored session."));
}

#[test]
fn set_server_rejects_bad_urls() {
    let (_home, mut cmd) = gameboard();
    cmd.args(["--set-server", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid URL"));
}

#[test]
fn set_server_needs_a_value() {
    let (_home, mut cmd) = gameboard();
    cmd.arg("--set-server")
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a URL"));
}
