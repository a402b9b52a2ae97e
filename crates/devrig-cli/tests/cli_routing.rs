//! CLI binary integration tests.
//!
//! These tests exercise the compiled `devrig` binary to verify command
//! routing, exit status mapping, and the keystore and demux round trips.

use devrig_stream::{encode_frame, StreamType};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const MASTER_KEY_HEX: &str = "5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a";

/// A `devrig` command isolated under `home`.
fn devrig(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_devrig"));
    cmd.env("DEVRIG_HOME", home)
        .env_remove("DEVRIG_CONFIG")
        .env_remove("DEVRIG_PASSWORD")
        .env_remove("DEVRIG_MASTER_KEY")
        .env_remove("DEVRIG_SECRETS_DIR")
        .env_remove("DEVRIG_RUN_TIMEOUT")
        .env_remove("DEVRIG_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = devrig(home.path()).arg("version").output().unwrap();
    assert!(output.status.success(), "version command should succeed");
    assert!(
        stdout(&output).starts_with("devrig "),
        "version output should start with 'devrig', got: {}",
        stdout(&output)
    );
}

#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = devrig(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success(), "--help should succeed");
    let text = stdout(&output);
    for command in ["secrets", "run", "demux", "config"] {
        assert!(text.contains(command), "help should mention '{command}': {text}");
    }
}

#[test]
fn test_cli_unknown_command() {
    let home = TempDir::new().unwrap();
    let output = devrig(home.path())
        .arg("nonexistent-command")
        .output()
        .unwrap();
    assert!(
        !output.status.success(),
        "unknown command should return non-zero exit code"
    );
}

#[cfg(unix)]
#[test]
fn test_run_mirrors_child_exit_code() {
    let home = TempDir::new().unwrap();
    let output = devrig(home.path())
        .args(["run", "--", "/bin/sh", "-c", "echo from-child; exit 3"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stdout(&output), "from-child\n");
}

#[test]
fn test_run_missing_program_exits_127() {
    let home = TempDir::new().unwrap();
    let output = devrig(home.path())
        .args(["run", "--", "/nonexistent/devrig-missing"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(127));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to start"));
}

#[cfg(unix)]
#[test]
fn test_run_timeout_exits_130() {
    let home = TempDir::new().unwrap();
    let output = devrig(home.path())
        .args(["run", "--timeout", "1", "--kill-grace-ms", "100", "--", "sleep", "30"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(130));
}

#[test]
fn test_secrets_round_trip() {
    let home = TempDir::new().unwrap();
    let with_key = |args: &[&str]| {
        devrig(home.path())
            .env("DEVRIG_MASTER_KEY", MASTER_KEY_HEX)
            .args(args)
            .output()
            .unwrap()
    };

    let set = with_key(&["secrets", "set", "api_token", "--value", "s3cret"]);
    assert!(set.status.success(), "{}", String::from_utf8_lossy(&set.stderr));

    let get = with_key(&["secrets", "get", "api_token"]);
    assert!(get.status.success());
    assert_eq!(stdout(&get), "s3cret\n");

    // Listing needs no key.
    let list = devrig(home.path()).args(["secrets", "list"]).output().unwrap();
    assert!(list.status.success());
    assert!(stdout(&list).contains("api_token"));

    let file = home.path().join("secrets").join("api_token.json");
    let doc = std::fs::read_to_string(&file).unwrap();
    assert!(!doc.contains("s3cret"), "plaintext must not be stored");

    let delete = devrig(home.path())
        .args(["secrets", "delete", "api_token"])
        .output()
        .unwrap();
    assert!(delete.status.success());
    assert!(!file.exists());
}

#[test]
fn test_secrets_wrong_key_fails() {
    let home = TempDir::new().unwrap();
    let set = devrig(home.path())
        .env("DEVRIG_MASTER_KEY", MASTER_KEY_HEX)
        .args(["secrets", "set", "api_token", "--value", "s3cret"])
        .output()
        .unwrap();
    assert!(set.status.success());

    let get = devrig(home.path())
        .env("DEVRIG_MASTER_KEY", "11".repeat(32))
        .args(["secrets", "get", "api_token"])
        .output()
        .unwrap();
    assert!(!get.status.success());
    assert!(stdout(&get).is_empty());
}

#[test]
fn test_secrets_keygen_prints_usable_key() {
    let home = TempDir::new().unwrap();
    let output = devrig(home.path()).args(["secrets", "keygen"]).output().unwrap();
    assert!(output.status.success());
    let key = stdout(&output).trim().to_string();
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_demux_file_splits_channels() {
    let home = TempDir::new().unwrap();
    let mut bytes = encode_frame(StreamType::Stdout, b"to stdout\n").unwrap();
    bytes.extend(encode_frame(StreamType::Stderr, b"to stderr\n").unwrap());
    let input = home.path().join("attach.bin");
    std::fs::write(&input, &bytes).unwrap();

    let output = devrig(home.path()).arg("demux").arg(&input).output().unwrap();
    assert!(output.status.success());
    assert_eq!(output.stdout, b"to stdout\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("to stderr\n"));
}

#[test]
fn test_demux_malformed_file_fails() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("garbage.bin");
    std::fs::write(&input, [0xffu8; 16]).unwrap();

    let output = devrig(home.path()).arg("demux").arg(&input).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_config_path_honours_flag() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.json5");
    let output = devrig(home.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "path"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), path.display().to_string());
}
