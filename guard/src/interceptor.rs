//! `SIGSYS` handler registration and the handler itself.
use std::fmt::Write;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::GuardError;
use crate::error::Result;
use crate::fault::FaultEvent;
use crate::message::MESSAGE_CAPACITY;
use crate::message::MessageBuf;
use crate::sink::FaultSink;
use crate::sink::Level;
use crate::sink::PlatformSink;

static GLOBAL_INTERCEPTOR: FaultInterceptor = FaultInterceptor::new();

/// Number of `SIGSYS` deliveries the installed handler has processed.
static INTERCEPTED_FAULTS: AtomicU64 = AtomicU64::new(0);

const NOT_INSTALLED: u8 = 0;
const INSTALLING: u8 = 1;
const INSTALLED: u8 = 2;

const INSTALLED_MESSAGE: &str = "Successfully set SIGSYS handler";
const INSTALL_FAILED_MESSAGE: &str = "Failed to set SIGSYS handler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Installed,
    /// A previous call already installed (or is installing) the handler; the
    /// disposition was left untouched.
    AlreadyInstalled,
    /// `sigaction` failed. The process keeps the default `SIGSYS` disposition.
    Failed,
}

/// Owns the `Not Installed -> Installed` transition for the `SIGSYS` handler.
///
/// Installing twice is rejected rather than re-registering: the second call is
/// a no-op that returns [`InstallStatus::AlreadyInstalled`]. A failed install
/// returns to `Not Installed`, so a later call may retry.
#[derive(Debug)]
pub struct FaultInterceptor {
    state: AtomicU8,
}

impl Default for FaultInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultInterceptor {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(NOT_INSTALLED),
        }
    }

    /// The process-wide interceptor used by [`crate::initialize`].
    pub fn global() -> &'static Self {
        &GLOBAL_INTERCEPTOR
    }

    pub fn is_installed(&self) -> bool {
        self.state.load(Ordering::Acquire) == INSTALLED
    }

    /// Register the handler for `SIGSYS`. Failures are logged, never returned.
    ///
    /// The outcome goes to the platform sink as well as to `tracing`, since a
    /// host app usually has no subscriber installed.
    pub fn install(&self) -> InstallStatus {
        self.install_with(&PlatformSink, register_sigsys_handler)
    }

    pub(crate) fn install_with<S, F>(&self, sink: &S, register: F) -> InstallStatus
    where
        S: FaultSink + ?Sized,
        F: FnOnce() -> Result<()>,
    {
        if self
            .state
            .compare_exchange(NOT_INSTALLED, INSTALLING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("SIGSYS handler already installed; ignoring repeated install");
            return InstallStatus::AlreadyInstalled;
        }

        match register() {
            Ok(()) => {
                self.state.store(INSTALLED, Ordering::Release);
                info!("{INSTALLED_MESSAGE}");
                sink.emit(Level::Info, INSTALLED_MESSAGE);
                InstallStatus::Installed
            }
            Err(err) => {
                self.state.store(NOT_INSTALLED, Ordering::Release);
                warn!(error = %err, "{INSTALL_FAILED_MESSAGE}; continuing without it");
                let mut message = MessageBuf::<MESSAGE_CAPACITY>::new();
                let _ = write!(message, "{INSTALL_FAILED_MESSAGE}: {err}");
                sink.emit(Level::Warn, message.as_str());
                InstallStatus::Failed
            }
        }
    }
}

pub fn intercepted_faults() -> u64 {
    INTERCEPTED_FAULTS.load(Ordering::Relaxed)
}

/// Format `event` and hand it to `sink` as one warning line.
///
/// Safe to call from signal context as long as `sink` is.
pub fn report_fault<S>(event: &FaultEvent, sink: &S)
where
    S: FaultSink + ?Sized,
{
    let mut message = MessageBuf::<MESSAGE_CAPACITY>::new();
    let _ = write!(message, "{event}");
    sink.emit(Level::Warn, message.as_str());
}

fn register_sigsys_handler() -> Result<()> {
    // SAFETY: an all-zero sigaction is a valid value (no flags, no restorer);
    // every field we rely on is set below.
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = sigsys_handler as *const () as libc::sighandler_t;
    action.sa_flags = libc::SA_SIGINFO;

    let rc = unsafe {
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGSYS, &action, std::ptr::null_mut())
    };
    if rc != 0 {
        return Err(GuardError::SignalAction {
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Runs on the thread whose syscall was trapped. Only signal-safe work:
/// an atomic increment, stack formatting, and one write to the platform sink.
/// Returning lets the trapped syscall fail back to its caller.
extern "C" fn sigsys_handler(
    _signum: libc::c_int,
    info: *mut libc::siginfo_t,
    _context: *mut libc::c_void,
) {
    let saved_errno = errno::get();

    // SAFETY: the kernel hands SA_SIGINFO handlers a valid siginfo_t.
    if let Some(event) = unsafe { FaultEvent::from_siginfo(info) } {
        INTERCEPTED_FAULTS.fetch_add(1, Ordering::Relaxed);
        report_fault(&event, &PlatformSink);
    }

    errno::set(saved_errno);
}

mod errno {
    #[cfg(target_os = "android")]
    fn location() -> *mut libc::c_int {
        unsafe { libc::__errno() }
    }

    #[cfg(target_os = "linux")]
    fn location() -> *mut libc::c_int {
        unsafe { libc::__errno_location() }
    }

    pub(super) fn get() -> libc::c_int {
        unsafe { *location() }
    }

    pub(super) fn set(value: libc::c_int) {
        unsafe { *location() = value };
    }
}
