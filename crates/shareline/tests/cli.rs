//! Integration tests for the shareline binary

use assert_cmd::cargo;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Empty config file so tests never pick up a real one from the host.
fn hermetic_config(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();
    path
}

#[test]
fn write_creates_record_file_and_audit_log() {
    let temp_dir = TempDir::new().unwrap();
    let config = hermetic_config(&temp_dir);
    let mount = temp_dir.path().join("mount");
    fs::create_dir_all(mount.join("records")).unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("write")
        .arg("--config")
        .arg(&config)
        .arg("--mount")
        .arg(&mount)
        .arg("--url")
        .arg("smb://clinic/records/2024/visits.csv")
        .arg("--line")
        .arg("1,one")
        .assert()
        .success()
        .stdout(predicates::str::contains("Wrote "));

    let written = fs::read_to_string(mount.join("records/2024/visits.csv")).unwrap();
    assert!(written.starts_with("created_at,"));
    assert!(written.ends_with("1,one\n"));

    let audit = fs::read_to_string(mount.join("records/2024/audit_access_log.csv")).unwrap();
    assert_eq!(audit, "timestamp,name,motivo\n");
}

#[test]
fn non_atomic_writes_accumulate_through_the_binary() {
    let temp_dir = TempDir::new().unwrap();
    let config = hermetic_config(&temp_dir);
    let mount = temp_dir.path().join("mount");
    fs::create_dir_all(mount.join("records")).unwrap();

    for line in ["1,one", "2,two"] {
        let mut cmd = cargo::cargo_bin_cmd!("shareline");
        cmd.arg("write")
            .arg("--config")
            .arg(&config)
            .arg("--mount")
            .arg(&mount)
            .arg("--url")
            .arg("smb://clinic/records/visits.csv")
            .arg("--line")
            .arg(line)
            .arg("--no-atomic")
            .assert()
            .success();
    }

    let written = fs::read_to_string(mount.join("records/visits.csv")).unwrap();
    assert!(written.contains("1,one\n"));
    assert!(written.ends_with("2,two\n"));
}

#[test]
fn write_json_output_reports_the_receipt() {
    let temp_dir = TempDir::new().unwrap();
    let config = hermetic_config(&temp_dir);
    let mount = temp_dir.path().join("mount");
    fs::create_dir_all(mount.join("records")).unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    let output = cmd
        .arg("write")
        .arg("--config")
        .arg(&config)
        .arg("--mount")
        .arg(&mount)
        .arg("--url")
        .arg("smb://clinic/records/visits.csv")
        .arg("--line")
        .arg("1,one")
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .clone();

    let receipt: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(receipt["url"], "smb://clinic/records/visits.csv");
    assert_eq!(receipt["attempts"], 1);
}

#[test]
fn missing_line_is_rejected_before_any_transport_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config = hermetic_config(&temp_dir);

    // No --mount on purpose: input validation must come first.
    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("write")
        .arg("--config")
        .arg(&config)
        .arg("--url")
        .arg("smb://clinic/records/visits.csv")
        .assert()
        .failure()
        .stderr(predicates::str::contains("missing url or line"));
}

#[test]
fn encrypt_then_decrypt_roundtrips_with_a_passphrase() {
    let temp_dir = TempDir::new().unwrap();
    let plain_path = temp_dir.path().join("note.txt");
    let sealed_path = temp_dir.path().join("note.bin");
    let opened_path = temp_dir.path().join("note.out");
    fs::write(&plain_path, "registro confidencial\n").unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("encrypt")
        .arg(&plain_path)
        .arg(&sealed_path)
        .arg("--passphrase")
        .arg("historia-29")
        .assert()
        .success();

    let sealed = fs::read(&sealed_path).unwrap();
    assert_eq!(&sealed[..8], b"HIPOSENC");
    assert_eq!(sealed[8], 2);

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("decrypt")
        .arg(&sealed_path)
        .arg(&opened_path)
        .arg("--passphrase")
        .arg("historia-29")
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&opened_path).unwrap(),
        "registro confidencial\n"
    );
}

#[test]
fn decrypt_with_the_wrong_passphrase_fails() {
    let temp_dir = TempDir::new().unwrap();
    let plain_path = temp_dir.path().join("note.txt");
    let sealed_path = temp_dir.path().join("note.bin");
    fs::write(&plain_path, "registro confidencial\n").unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("encrypt")
        .arg(&plain_path)
        .arg(&sealed_path)
        .arg("--passphrase")
        .arg("historia-29")
        .assert()
        .success();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("decrypt")
        .arg(&sealed_path)
        .arg(temp_dir.path().join("note.out"))
        .arg("--passphrase")
        .arg("wrong")
        .assert()
        .failure();
}

#[test]
fn decrypt_of_a_passphrase_envelope_requires_the_passphrase() {
    let temp_dir = TempDir::new().unwrap();
    let plain_path = temp_dir.path().join("note.txt");
    let sealed_path = temp_dir.path().join("note.bin");
    fs::write(&plain_path, "registro\n").unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("encrypt")
        .arg(&plain_path)
        .arg(&sealed_path)
        .arg("--passphrase")
        .arg("historia-29")
        .assert()
        .success();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("decrypt")
        .arg(&sealed_path)
        .arg(temp_dir.path().join("note.out"))
        .assert()
        .failure()
        .stderr(predicates::str::contains("passphrase envelope"));
}

#[test]
fn failed_write_spools_and_drain_delivers_once_the_share_returns() {
    let temp_dir = TempDir::new().unwrap();
    let config = hermetic_config(&temp_dir);
    let mount = temp_dir.path().join("mount");
    let spool_dir = temp_dir.path().join("spool");
    // The mount exists but the share directory does not, so the write fails
    // with a retryable error.
    fs::create_dir_all(&mount).unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("write")
        .arg("--config")
        .arg(&config)
        .arg("--mount")
        .arg(&mount)
        .arg("--url")
        .arg("smb://clinic/records/visits.csv")
        .arg("--line")
        .arg("1,one")
        .arg("--retries")
        .arg("1")
        .arg("--retry-delay-ms")
        .arg("10")
        .arg("--spool-on-failure")
        .arg("--spool-dir")
        .arg(&spool_dir)
        .assert()
        .success()
        .stderr(predicates::str::contains("spooled"));

    let queued: Vec<_> = fs::read_dir(&spool_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
        .collect();
    assert_eq!(queued.len(), 1);

    // Share comes back; drain replays the queue.
    fs::create_dir_all(mount.join("records")).unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("drain")
        .arg("--config")
        .arg(&config)
        .arg("--mount")
        .arg(&mount)
        .arg("--spool-dir")
        .arg(&spool_dir)
        .assert()
        .success()
        .stdout(predicates::str::contains("Delivered 1 record(s), 0 remaining"));

    let written = fs::read_to_string(mount.join("records/visits.csv")).unwrap();
    assert!(written.contains("1,one"));

    let left: Vec<_> = fs::read_dir(&spool_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
        .collect();
    assert!(left.is_empty());
}

#[test]
fn export_renders_a_spreadsheet_target_as_quoted_csv() {
    let temp_dir = TempDir::new().unwrap();
    let config = hermetic_config(&temp_dir);
    let mount = temp_dir.path().join("mount");
    fs::create_dir_all(mount.join("records")).unwrap();

    for line in [
        "2024-03-01T10:00:00Z,Ana,555123,ana@b.es,28001,Madrid,Calle 1,visita",
        "2024-03-02T09:00:00Z,Luis,555999,luis@b.es,28002,Madrid,Calle 2,entrega",
    ] {
        let mut cmd = cargo::cargo_bin_cmd!("shareline");
        cmd.arg("write")
            .arg("--config")
            .arg(&config)
            .arg("--mount")
            .arg(&mount)
            .arg("--url")
            .arg("smb://clinic/records/visits.xlsx")
            .arg("--line")
            .arg(line)
            .assert()
            .success();
    }

    let out = temp_dir.path().join("visits.csv");
    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("export")
        .arg(mount.join("records/visits.xlsx"))
        .arg(&out)
        .assert()
        .success()
        .stdout(predicates::str::contains("Exported "));

    let csv = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("\"created_at\",\"nombre\""));
    assert!(lines[1].contains("\"Ana\""));
    assert!(lines[2].contains("\"Luis\""));
}

#[test]
fn export_of_a_non_workbook_fails() {
    let temp_dir = TempDir::new().unwrap();
    let not_a_workbook = temp_dir.path().join("notes.xlsx");
    fs::write(&not_a_workbook, "plain text").unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("export")
        .arg(&not_a_workbook)
        .arg(temp_dir.path().join("out.csv"))
        .assert()
        .failure()
        .stderr(predicates::str::contains("not a readable workbook"));
}

#[test]
fn drain_with_an_empty_spool_reports_nothing_to_do() {
    let temp_dir = TempDir::new().unwrap();
    let config = hermetic_config(&temp_dir);
    let mount = temp_dir.path().join("mount");
    fs::create_dir_all(mount.join("records")).unwrap();

    let mut cmd = cargo::cargo_bin_cmd!("shareline");
    cmd.arg("drain")
        .arg("--config")
        .arg(&config)
        .arg("--mount")
        .arg(&mount)
        .arg("--spool-dir")
        .arg(temp_dir.path().join("spool"))
        .assert()
        .success()
        .stdout(predicates::str::contains("Spool is empty"));
}
