use assert_cmd::{Command, cargo_bin_cmd};
use std::fs;
use tempfile::TempDir;

/// The binary with provider credentials and Redis stripped from the
/// environment, so runs never leave the process.
fn dischargeval() -> Command {
    let mut cmd = cargo_bin_cmd!("dischargeval");
    for key in [
        "GEMINI_API_KEY",
        "ANTHROPIC_API_KEY",
        "REDIS_ENABLED",
        "DV_CONFIG",
        "DV_CHECKS",
        "RUST_LOG"
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod help_and_version {
    use super::*;
    use predicates::prelude::predicate;

    #[test]
    fn test_help_flag() {
        dischargeval()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"))
            .stdout(predicate::str::contains("analyze"))
            .stdout(predicate::str::contains("serve"));
    }

    #[test]
    fn test_version_flag() {
        dischargeval()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("dischargeval"));
    }

    #[test]
    fn test_no_args_shows_help() {
        dischargeval()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Usage:"));
    }

    #[test]
    fn test_unknown_provider_is_rejected_by_parser() {
        dischargeval()
            .args(["analyze", "summary.txt", "--provider", "gpt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }
}

mod analyze_subcommand {
    use super::*;
    use predicates::prelude::predicate;

    #[test]
    fn test_missing_file_fails() {
        dischargeval()
            .args(["analyze", "/nonexistent/summary.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read"));
    }

    #[test]
    fn test_empty_file_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.txt", b"   \n");

        dischargeval()
            .arg("analyze")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("VALIDATION"));
    }

    #[test]
    fn test_non_utf8_file_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "scan.pdf", &[0x25, 0x50, 0xff, 0xfe]);

        dischargeval()
            .arg("analyze")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("VALIDATION"));
    }

    #[test]
    fn test_unconfigured_provider_is_fatal_config() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "summary.txt", testing::SAMPLE_SUMMARY.as_bytes());

        dischargeval()
            .arg("analyze")
            .arg(&path)
            .args(["--provider", "claude"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("FATAL_CONFIG"));
    }

    #[test]
    fn test_json_mode_prints_error_event() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "summary.txt", testing::SAMPLE_SUMMARY.as_bytes());

        let output = dischargeval()
            .arg("analyze")
            .arg(&path)
            .arg("--json")
            .output()
            .unwrap();
        assert!(!output.status.success());

        let stdout = String::from_utf8(output.stdout).unwrap();
        let line: serde_json::Value =
            serde_json::from_str(stdout.lines().next().unwrap()).unwrap();
        assert_eq!(line["event"], "error");
        assert_eq!(line["data"]["kind"], "FATAL_CONFIG");
    }

    #[test]
    fn test_invalid_config_file_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_file(&dir, "dischargeval.toml", b"[server\nport = ");
        let path = write_file(&dir, "summary.txt", b"Diagnosis: pneumonia");

        dischargeval()
            .arg("--config")
            .arg(&config)
            .arg("analyze")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load configuration"));
    }
}

mod providers_subcommand {
    use super::*;
    use predicates::prelude::predicate;

    #[test]
    fn test_providers_without_keys() {
        dischargeval()
            .arg("providers")
            .assert()
            .success()
            .stdout(predicate::str::contains("not configured"));
    }

    #[test]
    fn test_providers_json() {
        let output = dischargeval()
            .args(["providers", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(body["gemini"]["configured"], false);
        assert_eq!(body["claude"]["configured"], false);
    }
}

mod completion_subcommand {
    use super::*;
    use predicates::prelude::predicate;

    #[test]
    fn test_bash_completion() {
        dischargeval()
            .args(["completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dischargeval"));
    }
}
