#![allow(clippy::unwrap_used)]

use std::io::Write;

use predicates::prelude::*;
use pretty_assertions::assert_eq;
use sigsys_guard::config::ACTIVATION_ENV_VAR;
use sigsys_guard::config::LAST_AFFECTED_API_LEVEL_ENV_VAR;
use tempfile::NamedTempFile;

use super::probe_command;

const ACTIVATION_LINE: &str = "[sigsys-guard] INFO Successfully set SIGSYS handler";

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn never_activation_reports_disabled() {
    probe_command()
        .args(["--activation", "never"])
        .assert()
        .success()
        .stdout(predicate::str::contains("guard status: Disabled"));
}

#[test]
fn always_activation_installs_and_logs_once() {
    let output = probe_command()
        .args(["--activation", "always"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("guard status: Installed"), "{stdout}");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr
            .lines()
            .filter(|line| *line == ACTIVATION_LINE)
            .count(),
        1,
        "{stderr}"
    );
}

#[test]
fn activation_line_reaches_stderr_without_a_subscriber() {
    let output = probe_command()
        .env("RUST_LOG", "off")
        .args(["--activation", "always"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.lines().collect::<Vec<_>>(),
        vec![ACTIVATION_LINE],
        "{stderr}"
    );
}

#[cfg(not(target_os = "android"))]
#[test]
fn auto_activation_skips_hosts_without_api_level() {
    probe_command()
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "guard status: NotApplicable { api_level: None }",
        ));
}

#[test]
fn config_file_is_applied() {
    let file = config_file("activation = \"never\"\nlast_affected_api_level = 29\n");
    probe_command()
        .arg("--config")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("guard status: Disabled"));
}

#[test]
fn environment_overrides_config_file() {
    let file = config_file("activation = \"never\"\n");
    probe_command()
        .arg("--config")
        .arg(file.path())
        .env(ACTIVATION_ENV_VAR, "always")
        .assert()
        .success()
        .stdout(predicate::str::contains("guard status: Installed"));
}

#[test]
fn cli_overrides_environment() {
    probe_command()
        .env(ACTIVATION_ENV_VAR, "always")
        .args(["--activation", "never"])
        .assert()
        .success()
        .stdout(predicate::str::contains("guard status: Disabled"));
}

#[test]
fn invalid_environment_value_is_rejected() {
    probe_command()
        .env(LAST_AFFECTED_API_LEVEL_ENV_VAR, "eleven")
        .assert()
        .failure()
        .stderr(predicate::str::contains(LAST_AFFECTED_API_LEVEL_ENV_VAR));
}

#[test]
fn malformed_config_file_is_rejected() {
    let file = config_file("activation = [\n");
    probe_command()
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse guard config"));
}
