//! Smoke tests -- drive the binary end to end against a throwaway scripts folder.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn helpdesk(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("helpdesk-shell").unwrap();
    cmd.env_remove("HELPDESK_SCRIPTS_DIR")
        .env_remove("HELPDESK_LOG_DIR")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    cmd
}

/// Temp workspace with `Scripts/`, `Logs/` and a config that runs `.sh` files through `sh`
fn sandbox() -> TempDir {
    let dir = TempDir::new().unwrap();
    let scripts = dir.path().join("Scripts");
    let logs = dir.path().join("Logs");
    std::fs::create_dir_all(&scripts).unwrap();

    let config = format!(
        r#"scripts_dir = {scripts:?}
log_dir = {logs:?}
elevation = "inherit"
redraw_interval_ms = 10

[interpreter]
program = "sh"
args = []
extension = "sh"
"#,
        scripts = scripts.display().to_string(),
        logs = logs.display().to_string(),
    );
    std::fs::write(dir.path().join("config.toml"), config).unwrap();
    dir
}

fn write_script(dir: &TempDir, name: &str, body: &str) {
    std::fs::write(dir.path().join("Scripts").join(name), body).unwrap();
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("helpdesk-shell")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Help Desk Shell"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("helpdesk-shell")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("helpdesk-shell"));
}

#[test]
fn test_run_subcommand_exists() {
    Command::cargo_bin("helpdesk-shell")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success();
}

#[test]
fn test_run_missing_script_exits_127() {
    let dir = sandbox();
    helpdesk(&dir.path().join("config.toml"))
        .args(["run", "NonexistentScript"])
        .assert()
        .code(127)
        .stderr(predicate::str::contains("Script not found"));
}

#[test]
fn test_scripts_reports_missing() {
    let dir = sandbox();
    write_script(&dir, "Setup.sh", "echo setup\n");
    helpdesk(&dir.path().join("config.toml"))
        .arg("scripts")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Setup"));
}

#[test]
fn test_config_show() {
    let dir = sandbox();
    helpdesk(&dir.path().join("config.toml"))
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("redraw_interval_ms = 10"));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = sandbox();
    helpdesk(&dir.path().join("config.toml"))
        .args(["config", "init"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[cfg(unix)]
#[test]
fn test_run_streams_output_and_mirrors_log() {
    let dir = sandbox();
    write_script(&dir, "Setup.sh", "echo one\necho two\n");

    helpdesk(&dir.path().join("config.toml"))
        .args(["run", "setup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== SETUP START ==="))
        .stdout(predicate::str::contains("[PS] one"))
        .stdout(predicate::str::contains("[PS] two"))
        .stdout(predicate::str::contains("[DONE] Setup.sh exited with code 0"));

    let mirrors: Vec<_> = std::fs::read_dir(dir.path().join("Logs"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.starts_with("log_") && name.ends_with(".txt")
        })
        .collect();
    assert_eq!(mirrors.len(), 1);

    let content = std::fs::read_to_string(mirrors[0].path()).unwrap();
    assert!(content.contains("[PS] one"));
    assert!(content.contains("exited with code 0"));
}

#[cfg(unix)]
#[test]
fn test_run_propagates_script_exit_code() {
    let dir = sandbox();
    write_script(&dir, "Undo.sh", "echo failing >&2\nexit 3\n");

    helpdesk(&dir.path().join("config.toml"))
        .args(["run", "undo"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("[ERROR] failing"));
}

#[cfg(unix)]
#[test]
fn test_script_exit_127_is_not_reported_as_missing_script() {
    let dir = sandbox();
    write_script(&dir, "Setup.sh", "exit 127\n");
    let config = dir.path().join("config.toml");

    helpdesk(&config)
        .args(["run", "setup"])
        .assert()
        .code(125)
        .stdout(predicate::str::contains("[DONE] Setup.sh exited with code 127"))
        .stderr(predicate::str::contains("exited with code 127, which is reserved"));

    helpdesk(&config)
        .args(["run", "Nope"])
        .assert()
        .code(127);
}

#[cfg(unix)]
#[test]
fn test_run_json_output() {
    let dir = sandbox();
    write_script(&dir, "Restrict.sh", "echo locked\n");

    helpdesk(&dir.path().join("config.toml"))
        .args(["run", "restrict", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"event\":\"entry\""))
        .stdout(predicate::str::contains("locked"));
}
