//! Keeps a process alive when seccomp traps a syscall with `SIGSYS`.
//!
//! Android 11 and older ship an app seccomp policy that rejects `pidfd_open`
//! with `SECCOMP_RET_TRAP`, and the default `SIGSYS` disposition kills the
//! process. [`initialize`] checks the device API level once and, on affected
//! releases, installs a handler that logs the trapped call and returns so the
//! syscall fails back to its caller instead.
//!
//! Call [`initialize`] as early as possible during startup, before any thread
//! can reach the trapped syscall, or enable the `auto-init` feature to run it
//! from a load-time constructor.
use std::sync::OnceLock;

use tracing::debug;
use tracing::warn;

mod api_level;
pub mod config;
mod error;
mod fault;
#[cfg(any(target_os = "linux", target_os = "android"))]
mod interceptor;
mod message;
mod sink;

pub use api_level::VersionGate;
pub use api_level::device_api_level;
pub use config::Activation;
pub use config::GuardConfig;
pub use error::GuardError;
pub use error::Result;
pub use fault::AuditArch;
pub use fault::FaultEvent;
pub use fault::SYS_SECCOMP;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use interceptor::FaultInterceptor;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use interceptor::InstallStatus;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub use interceptor::report_fault;
pub use sink::FaultSink;
pub use sink::LOG_TAG;
pub use sink::Level;
pub use sink::PlatformSink;

static STATUS: OnceLock<GuardStatus> = OnceLock::new();

/// Outcome of [`initialize`], fixed for the rest of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardStatus {
    /// The device is newer than the last affected release, or its API level
    /// could not be determined.
    NotApplicable { api_level: Option<u32> },
    /// `activation = "never"`.
    Disabled,
    Installed,
    /// `sigaction` failed; the default `SIGSYS` disposition is still in place.
    InstallFailed,
    /// `SIGSYS` interception is only implemented for Linux and Android.
    Unsupported,
}

impl GuardStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Installed)
    }
}

/// Evaluate the version gate and install the `SIGSYS` handler if needed,
/// using the defaults overlaid with the `SIGSYS_GUARD_*` environment.
///
/// Runs once; later calls return the first result. Never fails: an invalid
/// environment is logged and replaced by the defaults.
pub fn initialize() -> GuardStatus {
    *STATUS.get_or_init(|| {
        let config = GuardConfig::from_env().unwrap_or_else(|err| {
            warn!(error = %err, "ignoring invalid SIGSYS guard environment; using defaults");
            GuardConfig::default()
        });
        activate(&config)
    })
}

/// Like [`initialize`] with an explicit configuration. If the guard was
/// already initialized, `config` is ignored and the existing status returned.
pub fn initialize_with_config(config: &GuardConfig) -> GuardStatus {
    *STATUS.get_or_init(|| activate(config))
}

/// The status recorded by the first initialization, if any.
pub fn status() -> Option<GuardStatus> {
    STATUS.get().copied()
}

/// Number of `SIGSYS` deliveries the handler has processed so far.
pub fn intercepted_faults() -> u64 {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        interceptor::intercepted_faults()
    }
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    {
        0
    }
}

fn activate(config: &GuardConfig) -> GuardStatus {
    activate_with(config, device_api_level(), install_global)
}

fn activate_with<F>(config: &GuardConfig, api_level: Option<u32>, install: F) -> GuardStatus
where
    F: FnOnce() -> GuardStatus,
{
    let gate = VersionGate::new(config.last_affected_api_level);
    match config.activation {
        Activation::Never => {
            debug!("SIGSYS guard disabled by configuration");
            GuardStatus::Disabled
        }
        Activation::Auto if !gate.is_applicable_to(api_level) => {
            debug!(
                ?api_level,
                last_affected_api_level = gate.last_affected_api_level(),
                "SIGSYS guard not needed on this platform"
            );
            GuardStatus::NotApplicable { api_level }
        }
        Activation::Auto | Activation::Always => install(),
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn install_global() -> GuardStatus {
    match FaultInterceptor::global().install() {
        InstallStatus::Installed | InstallStatus::AlreadyInstalled => GuardStatus::Installed,
        InstallStatus::Failed => GuardStatus::InstallFailed,
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn install_global() -> GuardStatus {
    warn!("SIGSYS interception is only supported on Linux and Android");
    GuardStatus::Unsupported
}

#[cfg(feature = "auto-init")]
#[ctor::ctor]
unsafe fn auto_initialize() {
    initialize();
}
