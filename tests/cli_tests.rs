use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("pybundle")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("build")
                .and(predicate::str::contains("preview"))
                .and(predicate::str::contains("validate"))
                .and(predicate::str::contains("cache")),
        );
}

#[test]
fn build_without_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("pybundle")
        .expect("binary")
        .arg("build")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing configuration file"));
}

#[test]
fn invalid_bitness_is_rejected() {
    Command::cargo_bin("pybundle")
        .expect("binary")
        .args(["build", "--bitness", "16"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--bitness must be 32 or 64"));
}

#[test]
fn conflicting_verbosity_flags_are_rejected() {
    Command::cargo_bin("pybundle")
        .expect("binary")
        .args(["--verbose", "--quiet", "cache", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mutually exclusive"));
}
