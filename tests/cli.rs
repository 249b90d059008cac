use assert_cmd::Command;
use predicates::prelude::*;

fn khitomer() -> Command {
    let mut cmd = Command::cargo_bin("khitomer").unwrap();
    cmd.env_clear();
    cmd
}

#[test]
fn schema_describes_config_sections() {
    khitomer()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"intake\""))
        .stdout(predicate::str::contains("\"status_filter\""));
}

#[test]
fn trigger_requires_service_credentials() {
    let dir = tempfile::tempdir().unwrap();
    khitomer()
        .current_dir(dir.path())
        .args(["trigger", "--ticket", "PROJ-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required setting 'tracker.base_url'"));
}

#[test]
fn invalid_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("khitomer.yaml");
    std::fs::write(&path, "intake: [not, a, map]\n").unwrap();

    khitomer()
        .arg("--config")
        .arg(&path)
        .args(["plan", "--ticket", "PROJ-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}
