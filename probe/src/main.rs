//! Entry point for the `sigsys-guard-probe` binary.
//!
//! Initializes the guard from `--config`, the `SIGSYS_GUARD_*` environment and
//! CLI overrides, prints the resulting status and, with `--simulate-seccomp`,
//! trips a real seccomp trap on `pidfd_open` to show whether the process
//! survives it.
use std::process::ExitCode;

use clap::Parser;
use sigsys_guard_probe::Cli;
use sigsys_guard_probe::run_main;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    run_main(cli)
}
