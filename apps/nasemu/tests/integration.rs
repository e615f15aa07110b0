//! Integration tests for the nasemu CLI

use std::process::Command;

fn nasemu() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nasemu"));
    command.env_remove("RUST_LOG");
    for key in [
        "XL_LISTEN",
        "XL_DIR_DOWNLOAD",
        "XL_DIR_DATA",
        "XL_UID",
        "XL_GID",
        "XL_PREVENT_UPDATE",
        "XL_SPK_URL",
    ] {
        command.env_remove(key);
    }
    command
}

#[test]
fn test_cli_version() {
    let output = nasemu()
        .arg("--version")
        .output()
        .expect("Failed to execute nasemu");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nasemu"));
}

#[test]
fn test_cli_help() {
    let output = nasemu()
        .arg("--help")
        .output()
        .expect("Failed to execute nasemu");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("emulated DSM environment"));
    assert!(stdout.contains("--dir-download"));
    assert!(stdout.contains("--prevent-update"));
    assert!(stdout.contains("--proc-mount-policy"));
}

#[test]
fn test_invalid_listen_fails_before_provisioning() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(&config, "").unwrap();

    let output = nasemu()
        .args(["--config"])
        .arg(&config)
        .args(["--listen", "not-an-address"])
        .output()
        .expect("Failed to execute nasemu");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_unknown_policy_rejected() {
    let output = nasemu()
        .args(["--proc-mount-policy", "sometimes"])
        .output()
        .expect("Failed to execute nasemu");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sometimes"));
}
