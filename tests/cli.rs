//! Smoke tests for the `abdo` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn abdo() -> Command {
    let mut cmd = Command::cargo_bin("abdo").unwrap();
    // Keep the developer's settings and key out of the run
    let home = tempfile::tempdir().unwrap().into_path();
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_STATE_HOME", home.join("state"))
        .env("HOME", &home)
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY");
    cmd
}

#[test]
fn help_lists_flags() {
    abdo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--prompt"))
        .stdout(predicate::str::contains("--attach"))
        .stdout(predicate::str::contains("--image-model"));
}

#[test]
fn version_matches_manifest() {
    abdo()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn rejects_unknown_mode() {
    abdo()
        .args(["--mode", "video", "-p", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("video"));
}

#[test]
fn single_prompt_without_key_fails_cleanly() {
    abdo()
        .args(["-p", "hello"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("API key not set"));
}

#[test]
fn missing_attachment_is_reported() {
    abdo()
        .args(["-p", "summarize", "-a", "/definitely/not/here.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot attach"));
}
