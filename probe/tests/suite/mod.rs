use sigsys_guard::config::ACTIVATION_ENV_VAR;
use sigsys_guard::config::LAST_AFFECTED_API_LEVEL_ENV_VAR;

mod config;
mod simulate;

/// The probe binary with a clean logging and guard environment.
pub(crate) fn probe_command() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(env!("CARGO_BIN_EXE_sigsys-guard-probe"));
    cmd.env_remove("RUST_LOG")
        .env_remove(ACTIVATION_ENV_VAR)
        .env_remove(LAST_AFFECTED_API_LEVEL_ENV_VAR);
    cmd
}
