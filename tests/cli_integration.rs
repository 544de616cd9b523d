//! Integration tests for the PassGen CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.  The
//! master password comes from `PASSGEN_PASSWORD` so nothing prompts, and
//! each test gets its own `--home` with a low KDF iteration count.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const MASTER: &str = "correct-horse-battery";

/// Helper: get a Command pointing at the passgen binary.
fn passgen() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("passgen").expect("binary should exist");
    cmd.env_remove("PASSGEN_PASSWORD")
        .env_remove("PASSGEN_NEW_PASSWORD")
        .env_remove("PASSGEN_HOME")
        .env_remove("PASSGEN_LOG");
    cmd
}

/// Helper: a home dir whose config keeps key derivation fast.
fn home() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child("config.toml")
        .write_str("kdf_iterations = 10000\nlock_wait_ms = 200\n")
        .unwrap();
    tmp
}

/// Helper: `passgen --home <home> <args>` with the master password set.
fn run(home: &TempDir, args: &[&str]) -> Command {
    let mut cmd = passgen();
    cmd.arg("--home")
        .arg(home.path())
        .args(args)
        .env("PASSGEN_PASSWORD", MASTER);
    cmd
}

fn init(home: &TempDir) {
    run(home, &["init"]).assert().success();
}

fn add(home: &TempDir, site: &str, username: &str, password: &str) {
    run(home, &["add", "-s", site, "-u", username, "--password-stdin"])
        .write_stdin(format!("{password}\n"))
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// Help and parsing
// ---------------------------------------------------------------------------

#[test]
fn help_flag_shows_usage() {
    passgen()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("password vault"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("__clear-clipboard").not());
}

#[test]
fn version_flag_shows_version() {
    passgen()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("passgen"));
}

#[test]
fn no_args_shows_help() {
    passgen()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn completions_for_bash() {
    passgen()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("passgen"));
}

#[test]
fn completions_for_unknown_shell_fail() {
    passgen().args(["completions", "csh"]).assert().failure();
}

// ---------------------------------------------------------------------------
// Vault lifecycle
// ---------------------------------------------------------------------------

#[test]
fn init_creates_the_vault_file() {
    let home = home();
    init(&home);
    home.child("vault.db").assert(predicate::path::is_file());
}

#[test]
fn init_twice_fails() {
    let home = home();
    init(&home);
    run(&home, &["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_rejects_a_short_master_password() {
    let home = home();
    passgen()
        .arg("--home")
        .arg(home.path())
        .arg("init")
        .env("PASSGEN_PASSWORD", "short")
        .assert()
        .failure();
    home.child("vault.db").assert(predicate::path::missing());
}

#[test]
fn add_then_list_shows_the_entry_but_not_the_password() {
    let home = home();
    init(&home);
    add(&home, "github", "alice", "s3cret-gh");

    run(&home, &["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("github"))
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("s3cret-gh").not());
}

#[test]
fn add_without_a_vault_is_not_found() {
    let home = home();
    run(&home, &["add", "-s", "x", "-u", "y", "--password-stdin"])
        .write_stdin("pw\n")
        .assert()
        .code(4);
}

#[test]
fn generated_entry_is_saved() {
    let home = home();
    init(&home);
    run(&home, &["add", "-s", "bank", "-u", "me", "-g", "-l", "24"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1"));

    run(&home, &["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bank"));
}

#[test]
fn search_filters_entries() {
    let home = home();
    init(&home);
    add(&home, "github", "alice", "a");
    add(&home, "bank", "alice", "b");
    add(&home, "gitlab", "bob", "c");

    run(&home, &["search", "GIT"])
        .assert()
        .success()
        .stdout(predicate::str::contains("github"))
        .stdout(predicate::str::contains("gitlab"))
        .stdout(predicate::str::contains("bank").not());
}

#[test]
fn wrong_master_password_exits_with_auth_code() {
    let home = home();
    init(&home);

    passgen()
        .arg("--home")
        .arg(home.path())
        .arg("list")
        .env("PASSGEN_PASSWORD", "not-the-password")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Authentication failed"));
}

#[test]
fn missing_master_password_without_a_terminal_fails() {
    let home = home();
    init(&home);

    passgen()
        .arg("--home")
        .arg(home.path())
        .arg("list")
        .assert()
        .code(2);
}

#[test]
fn delete_renumbers_entries() {
    let home = home();
    init(&home);
    add(&home, "A-site", "u", "a");
    add(&home, "B-site", "u", "b");
    add(&home, "C-site", "u", "c");

    run(&home, &["delete", "2", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("B-site"));

    run(&home, &["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("B-site").not())
        .stdout(predicate::str::contains("C-site"));

    run(&home, &["delete", "3", "--force"]).assert().code(4);
}

#[test]
fn edit_changes_fields() {
    let home = home();
    init(&home);
    add(&home, "mail", "old-name", "pw");

    run(&home, &["edit", "1", "-u", "new-name", "-t", "personal,email"])
        .assert()
        .success();

    run(&home, &["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("new-name"))
        .stdout(predicate::str::contains("personal"));
}

#[test]
fn edit_without_changes_fails() {
    let home = home();
    init(&home);
    add(&home, "mail", "me", "pw");

    run(&home, &["edit", "1"]).assert().failure();
}

#[test]
fn passwd_switches_the_master_password() {
    let home = home();
    init(&home);
    add(&home, "A-site", "u", "a");

    run(&home, &["passwd"])
        .env("PASSGEN_NEW_PASSWORD", "another-long-password")
        .assert()
        .success();

    run(&home, &["list"]).assert().code(2);

    passgen()
        .arg("--home")
        .arg(home.path())
        .arg("list")
        .env("PASSGEN_PASSWORD", "another-long-password")
        .assert()
        .success()
        .stdout(predicate::str::contains("A-site"));
}

#[test]
fn passwd_works_without_session_caching() {
    let tmp = TempDir::new().unwrap();
    tmp.child("config.toml")
        .write_str("kdf_iterations = 10000\nlock_wait_ms = 200\nsession_timeout_seconds = 0\n")
        .unwrap();
    init(&tmp);

    run(&tmp, &["passwd"])
        .env("PASSGEN_NEW_PASSWORD", "another-long-password")
        .assert()
        .success()
        .stdout(predicate::str::contains("Master password changed"));

    passgen()
        .arg("--home")
        .arg(tmp.path())
        .arg("list")
        .env("PASSGEN_PASSWORD", "another-long-password")
        .assert()
        .success();
}

#[test]
fn status_reports_the_vault_without_a_password() {
    let home = home();
    init(&home);
    add(&home, "A-site", "u", "a");

    passgen()
        .arg("--home")
        .arg(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("vault.db"))
        .stdout(predicate::str::contains("locked"));
}

#[test]
fn lock_succeeds() {
    let home = home();
    init(&home);
    run(&home, &["lock"]).assert().success();
}

#[test]
fn reset_force_deletes_the_vault() {
    let home = home();
    init(&home);

    run(&home, &["reset", "--force"]).assert().success();
    home.child("vault.db").assert(predicate::path::missing());
    run(&home, &["list"]).assert().code(4);
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_set_then_show() {
    let home = home();
    run(&home, &["config", "--session-timeout", "60"])
        .assert()
        .success();

    run(&home, &["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("session_timeout_seconds"))
        .stdout(predicate::str::contains("60"));

    home.child("config.toml")
        .assert(predicate::str::contains("session_timeout_seconds = 60"));
}

#[test]
fn config_rejects_out_of_range_values() {
    let home = home();
    run(&home, &["config", "--password-length", "2"])
        .assert()
        .code(5);
}

#[test]
fn broken_config_is_a_config_error_until_reset() {
    let home = TempDir::new().unwrap();
    home.child("config.toml").write_str("not = [valid").unwrap();

    run(&home, &["generate"]).assert().code(5);
    run(&home, &["config", "--reset"]).assert().success();
    run(&home, &["generate"]).assert().success();
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

#[test]
fn generate_respects_length_and_classes() {
    let home = home();
    let assert = run(&home, &["generate", "-l", "20", "--no-symbols"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let password = stdout.trim_end();
    assert_eq!(password.chars().count(), 20);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn generate_many() {
    let home = home();
    let assert = run(&home, &["generate", "-n", "3"]).assert().success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 3);
}

#[test]
fn generate_with_every_class_disabled_fails() {
    let home = home();
    run(
        &home,
        &[
            "generate",
            "--no-uppercase",
            "--no-lowercase",
            "--no-digits",
            "--no-symbols",
        ],
    )
    .assert()
    .failure();
}
