#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::Command;

fn glucotux() -> Command {
    Command::new(env!("CARGO_BIN_EXE_glucotux"))
}

fn missing_dir(tag: &str) -> PathBuf {
    PathBuf::from(format!(
        "/tmp/glucotux-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

#[test]
fn version_prints_package_version() {
    let output = glucotux().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("glucotux {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_lists_meters() {
    let output = glucotux()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: glucotux"));
    assert!(stdout.contains("Contour USB (6002)"));
    assert!(stdout.contains("Contour Next One (7800)"));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = glucotux().arg("merge").output().expect("glucotux should run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn help_lists_commands() {
    let output = glucotux().arg("--help").output().expect("help should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["read", "scan", "version"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[cfg(target_os = "linux")]
#[test]
fn scan_without_nodes_succeeds() {
    let prefix = missing_dir("scan").join("hiddev");
    let output = glucotux()
        .args(["--log-level", "error", "scan", "--nodes"])
        .arg(&prefix)
        .output()
        .expect("scan should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("no hid nodes found"));
}

#[cfg(target_os = "linux")]
#[test]
fn failed_read_keeps_previous_log() {
    let dir = missing_dir("read");
    std::fs::create_dir_all(&dir).expect("temp dir should be created");
    let log = dir.join("readout.log");
    std::fs::write(&log, "201909221314   93 mg/dL  B  Glucose   R     1\n")
        .expect("log should be written");
    // A regular file opens fine but fails the identity query.
    std::fs::write(dir.join("hiddev0"), b"").expect("node should be written");

    let output = glucotux()
        .args(["--log-level", "error", "read", "-o"])
        .arg(&log)
        .arg("--nodes")
        .arg(dir.join("hiddev"))
        .output()
        .expect("read should run");
    let kept = std::fs::read_to_string(&log);
    let _ = std::fs::remove_dir_all(&dir);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("readout failed"));
    assert_eq!(
        kept.expect("log should still exist"),
        "201909221314   93 mg/dL  B  Glucose   R     1\n"
    );
}
