// file: tests/cli_test.rs
// version: 1.0.0
// guid: a4f17c82-60d9-4b35-8ce1-f92d06b5a748

//! Binary-level CLI tests
//!
//! Input validation precedes all mutation, so every rejected invocation
//! here must exit before anything on the host is touched.

use assert_cmd::Command;
use predicates::prelude::*;

fn agent() -> Command {
    Command::cargo_bin("pterodactyl-install-agent").unwrap()
}

#[test]
fn test_no_subcommand_prints_usage() {
    agent()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_help_lists_subcommands() {
    agent()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_install_without_parameters_exits_2() {
    agent()
        .arg("install")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Missing required parameters"));
}

#[test]
fn test_install_missing_flags_are_named() {
    agent()
        .args([
            "install",
            "--domain",
            "panel.example.com",
            "--ssl",
            "true",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--email"))
        .stderr(predicate::str::contains("--pass"));
}

#[test]
fn test_install_positional_arity_enforced() {
    agent()
        .args(["install", "panel.example.com", "true", "admin@example.com"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Positional form"));
}

#[test]
fn test_install_rejects_malformed_boolean() {
    agent()
        .args([
            "install",
            "--domain",
            "panel.example.com",
            "--ssl",
            "sure",
            "--email",
            "admin@example.com",
            "--admin",
            "admin",
            "--first",
            "Ada",
            "--last",
            "Lovelace",
            "--pass",
            "correcthorse",
            "--wings",
            "false",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("boolean"));
}

#[test]
fn test_install_rejects_invalid_email() {
    agent()
        .args([
            "install",
            "--domain",
            "panel.example.com",
            "--ssl",
            "true",
            "--email",
            "not-an-email",
            "--admin",
            "admin",
            "--first",
            "Ada",
            "--last",
            "Lovelace",
            "--pass",
            "correcthorse",
            "--wings",
            "false",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("email"));
}

#[test]
fn test_install_rejects_bad_reserve_policy() {
    agent()
        .args([
            "install",
            "--reserve",
            "half",
            "--domain",
            "panel.example.com",
            "--ssl",
            "true",
            "--email",
            "admin@example.com",
            "--admin",
            "admin",
            "--first",
            "Ada",
            "--last",
            "Lovelace",
            "--pass",
            "correcthorse",
            "--wings",
            "false",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("reserve"));
}

#[test]
fn test_unknown_flag_rejected() {
    agent()
        .args(["install", "--frobnicate"])
        .assert()
        .failure()
        .code(2);
}
