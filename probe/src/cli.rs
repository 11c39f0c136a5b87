use std::path::PathBuf;

use clap::Parser;
use sigsys_guard::Activation;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Initialize the SIGSYS guard and optionally trip it with a real seccomp trap."
)]
pub struct Cli {
    /// TOML file with `activation` and `last_affected_api_level`.
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the activation mode: auto, always, or never.
    #[arg(long = "activation", short = 'a', value_name = "MODE")]
    pub activation: Option<Activation>,

    /// Override the highest API level that still needs the workaround.
    #[arg(long = "last-affected-api-level", value_name = "LEVEL")]
    pub last_affected_api_level: Option<u32>,

    /// Arm a seccomp filter that traps `pidfd_open`, then call it (Linux only).
    #[arg(long = "simulate-seccomp", default_value_t = false)]
    pub simulate_seccomp: bool,

    /// Number of threads that trip the trap concurrently.
    #[arg(
        long = "threads",
        short = 't',
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..=256)
    )]
    pub threads: u32,
}
