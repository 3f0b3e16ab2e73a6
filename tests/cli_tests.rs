//! Integration tests for the bacpacman CLI
//!
//! These tests run the built binary end-to-end. None of them needs Azure or
//! sqlpackage: PATH is pointed at an empty directory where a tool would be
//! looked up.

use std::path::Path;
use std::process::Command;

/// Get the path to the bacpacman binary
fn bacpacman_binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_bacpacman"))
}

/// Run bacpacman and return output
fn run_bacpacman(args: &[&str]) -> std::process::Output {
    Command::new(bacpacman_binary())
        .args(args)
        .output()
        .expect("Failed to execute bacpacman")
}

fn assert_help_mentions(args: &[&str], expected: &[&str]) {
    let output = run_bacpacman(args);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in expected {
        assert!(stdout.contains(flag), "{:?} help is missing {}", args, flag);
    }
}

#[test]
fn test_bacpacman_version() {
    let output = run_bacpacman(&["--version"]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bacpacman"));
}

#[test]
fn test_bacpacman_help() {
    let output = run_bacpacman(&["--help"]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("Commands:"));
    for command in [
        "import",
        "authenticate",
        "choose-scope",
        "list-servers",
        "list-databases",
        "run-export",
    ] {
        assert!(stdout.contains(command), "help is missing {}", command);
    }
}

#[test]
fn test_bacpacman_import_help() {
    assert_help_mentions(
        &["import", "--help"],
        &[
            "--input-file",
            "--server-name",
            "--database-name",
            "--auth",
            "--no-prompt",
        ],
    );
}

#[test]
fn test_bacpacman_run_export_help() {
    assert_help_mentions(
        &["run-export", "--help"],
        &["--server-name", "--database-name", "--output-file", "database.bacpac"],
    );
}

#[test]
fn test_bacpacman_choose_scope_help() {
    assert_help_mentions(&["choose-scope", "--help"], &["--subscription-id"]);
}

#[test]
fn test_bacpacman_list_databases_help() {
    assert_help_mentions(&["list-databases", "--help"], &["--server-name"]);
}

#[test]
fn test_bacpacman_invalid_command() {
    let output = run_bacpacman(&["nonexistent-command"]);

    assert!(!output.status.success());
}

#[test]
fn test_bacpacman_run_export_requires_server_and_database() {
    let output = run_bacpacman(&["run-export"]);

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--server-name"));
}

#[test]
fn test_bacpacman_rejects_unknown_auth_method() {
    let output = run_bacpacman(&["import", "--auth", "kerberos"]);

    assert!(!output.status.success());
}

// ============================================================================
// End-to-end tests with temp directories
// ============================================================================

mod workflow_tests {
    use super::*;
    use tempfile::TempDir;

    /// Helper to verify no panic occurred in command output
    fn assert_no_panic(output: &std::process::Output, context: &str) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            !stderr.contains("panic") && !stderr.contains("RUST_BACKTRACE"),
            "{} panicked.\nstderr: {}",
            context,
            stderr
        );
    }

    /// Run bacpacman in `dir` with an isolated config file and an empty PATH
    fn run_isolated(dir: &Path, args: &[&str]) -> std::process::Output {
        let empty_bin = dir.join("bin");
        std::fs::create_dir_all(&empty_bin).expect("Failed to create bin dir");

        Command::new(bacpacman_binary())
            .args(args)
            .current_dir(dir)
            .env("BACPACMAN_CONFIG", dir.join("config.yaml"))
            .env("PATH", &empty_bin)
            .output()
            .expect("Failed to execute bacpacman")
    }

    #[test]
    fn test_import_without_sqlpackage_explains_how_to_install() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let output = run_isolated(
            temp_dir.path(),
            &[
                "import",
                "--input-file",
                "nightly.bacpac",
                "--database-name",
                "nightly",
                "--no-prompt",
            ],
        );

        assert_no_panic(&output, "import without sqlpackage");
        assert!(!output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("sqlpackage"));
        assert!(stdout.contains("dotnet tool install") || stdout.contains("sqlpackage-download"));
    }

    #[test]
    fn test_list_servers_without_azure_cli_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let output = run_isolated(temp_dir.path(), &["list-servers"]);

        assert_no_panic(&output, "list-servers without az");
        assert!(!output.status.success());

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("az"));
    }

    #[test]
    fn test_choose_scope_with_id_is_saved_to_config() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let output = run_isolated(
            temp_dir.path(),
            &["choose-scope", "--subscription-id", "0000-1111-2222"],
        );

        assert_no_panic(&output, "choose-scope with id");
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let saved = std::fs::read_to_string(temp_dir.path().join("config.yaml"))
            .expect("config.yaml should be written");
        assert!(saved.contains("subscription_id"));
        assert!(saved.contains("0000-1111-2222"));
    }
}
