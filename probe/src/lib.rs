//! `sigsys-guard-probe`: initializes the SIGSYS guard the way a host
//! application would and, on Linux, trips it with a real seccomp trap.
use std::io::IsTerminal;
use std::process::ExitCode;

use sigsys_guard::GuardConfig;
use sigsys_guard::GuardStatus;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod cli;
#[cfg(target_os = "linux")]
pub mod simulate;

pub use cli::Cli;

/// Exit code when the host refuses to install the seccomp filter.
pub const SECCOMP_UNAVAILABLE_EXIT_CODE: u8 = 3;

const DEFAULT_LOG_LEVEL: &str = "info";

pub fn run_main(cli: Cli) -> anyhow::Result<ExitCode> {
    init_tracing();

    let config = resolve_config(&cli)?;
    let status = sigsys_guard::initialize_with_config(&config);
    println!("guard status: {status:?}");

    if !cli.simulate_seccomp {
        return Ok(ExitCode::SUCCESS);
    }
    simulate_seccomp(cli.threads, status)
}

/// Defaults, then the config file, then `SIGSYS_GUARD_*`, then CLI flags.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<GuardConfig> {
    let base = match &cli.config {
        Some(path) => GuardConfig::load(path)?,
        None => GuardConfig::default(),
    };
    let mut config = base.with_env_overrides()?;
    if let Some(activation) = cli.activation {
        config.activation = activation;
    }
    if let Some(level) = cli.last_affected_api_level {
        config.last_affected_api_level = level;
    }
    Ok(config)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

#[cfg(target_os = "linux")]
fn simulate_seccomp(threads: u32, status: GuardStatus) -> anyhow::Result<ExitCode> {
    use simulate::SimulationOutcome;

    if !status.is_active() {
        tracing::warn!(
            ?status,
            "SIGSYS guard is not active; the trapped call will terminate the process"
        );
    }
    eprintln!("triggering pidfd_open seccomp trap on {threads} thread(s)");

    match simulate::trip_pidfd_open_trap(threads)? {
        SimulationOutcome::Unavailable(reason) => {
            eprintln!("seccomp filter unavailable: {reason}");
            Ok(ExitCode::from(SECCOMP_UNAVAILABLE_EXIT_CODE))
        }
        SimulationOutcome::Completed(calls) => {
            for call in &calls {
                println!("pidfd_open returned {} (errno {:?})", call.ret, call.errno);
            }
            println!("intercepted faults: {}", sigsys_guard::intercepted_faults());
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn simulate_seccomp(_threads: u32, _status: GuardStatus) -> anyhow::Result<ExitCode> {
    anyhow::bail!("--simulate-seccomp is only supported on Linux")
}
