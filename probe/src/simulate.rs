//! Reproduces the Android `pidfd_open` seccomp trap on a regular Linux host.
//!
//! Each worker thread installs its own filter, so the rest of the process
//! (including the main thread) keeps running unfiltered.
use std::collections::BTreeMap;
use std::sync::Barrier;
use std::sync::OnceLock;

use anyhow::Result;
use seccompiler::BpfProgram;
use seccompiler::SeccompAction;
use seccompiler::SeccompFilter;
use seccompiler::SeccompRule;
use seccompiler::TargetArch;
use seccompiler::apply_filter;
use tracing::debug;

/// What a worker saw after calling the trapped syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrappedCall {
    /// Raw return value. After a trap this is whatever the kernel left in the
    /// return register, not a usable descriptor.
    pub ret: libc::c_long,
    pub errno: Option<i32>,
}

#[derive(Debug)]
pub enum SimulationOutcome {
    Completed(Vec<TrappedCall>),
    /// The kernel or container refused the filter; nothing was triggered.
    Unavailable(String),
}

/// Arm a `pidfd_open` trap on `threads` threads, then have all of them call
/// `pidfd_open` at once.
pub fn trip_pidfd_open_trap(threads: u32) -> Result<SimulationOutcome> {
    let threads = threads.max(1) as usize;
    let program = pidfd_open_trap_program()?;
    // An unguarded run dies from SIGSYS; do not leave a core file behind.
    set_core_file_size_limit_to_zero();

    let armed = Barrier::new(threads);
    let arm_failure: OnceLock<String> = OnceLock::new();

    let calls = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                let program = &program;
                let armed = &armed;
                let arm_failure = &arm_failure;
                scope.spawn(move || {
                    if let Err(err) = arm_trap_on_current_thread(program) {
                        let _ = arm_failure.set(format!("{err:#}"));
                    }
                    armed.wait();
                    if arm_failure.get().is_some() {
                        return None;
                    }
                    Some(call_pidfd_open())
                })
            })
            .collect();

        workers
            .into_iter()
            .filter_map(|worker| worker.join().ok().flatten())
            .collect::<Vec<_>>()
    });

    match arm_failure.into_inner() {
        Some(reason) => Ok(SimulationOutcome::Unavailable(reason)),
        None => Ok(SimulationOutcome::Completed(calls)),
    }
}

fn pidfd_open_trap_program() -> Result<BpfProgram> {
    let mut rules: BTreeMap<i64, Vec<SeccompRule>> = BTreeMap::new();
    rules.insert(i64::from(libc::SYS_pidfd_open), vec![]); // empty rule vec = unconditional match

    let filter = SeccompFilter::new(
        rules,
        SeccompAction::Allow, // default – allow
        SeccompAction::Trap,  // pidfd_open – SIGSYS with si_code = SYS_SECCOMP
        target_arch()?,
    )?;
    let program: BpfProgram = filter.try_into()?;
    Ok(program)
}

fn target_arch() -> Result<TargetArch> {
    if cfg!(target_arch = "x86_64") {
        Ok(TargetArch::x86_64)
    } else if cfg!(target_arch = "aarch64") {
        Ok(TargetArch::aarch64)
    } else {
        anyhow::bail!("unsupported architecture for the seccomp probe")
    }
}

fn arm_trap_on_current_thread(program: &BpfProgram) -> Result<()> {
    // Required for an unprivileged thread to install a seccomp filter.
    let rc = unsafe { libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) };
    if rc != 0 {
        return Err(anyhow::Error::new(std::io::Error::last_os_error())
            .context("prctl(PR_SET_NO_NEW_PRIVS) failed"));
    }
    apply_filter(program)?;
    debug!("armed pidfd_open seccomp trap");
    Ok(())
}

fn call_pidfd_open() -> TrappedCall {
    let ret = unsafe { libc::syscall(libc::SYS_pidfd_open, libc::getpid(), 0) };
    let errno = (ret < 0)
        .then(|| std::io::Error::last_os_error().raw_os_error())
        .flatten();
    TrappedCall { ret, errno }
}

fn set_core_file_size_limit_to_zero() {
    let rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    let ret_code = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };
    if ret_code != 0 {
        debug!(
            error = %std::io::Error::last_os_error(),
            "setrlimit(RLIMIT_CORE) failed"
        );
    }
}
