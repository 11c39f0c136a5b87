#![cfg(all(
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
))]
#![allow(clippy::unwrap_used)]

use std::os::unix::process::ExitStatusExt;
use std::process::Output;

use pretty_assertions::assert_eq;
use sigsys_guard_probe::SECCOMP_UNAVAILABLE_EXIT_CODE;

use super::probe_command;

const SECCOMP_UNAVAILABLE_ERR: &str = "seccomp filter unavailable";
const SECCOMP_LINE: &str = "Received seccomp SIGSYS";

fn run_probe(args: &[&str]) -> Output {
    probe_command().args(args).output().unwrap()
}

/// Containers may refuse nested seccomp filters; there is nothing to test then.
fn seccomp_unavailable(output: &Output) -> bool {
    let unavailable = output.status.code() == Some(i32::from(SECCOMP_UNAVAILABLE_EXIT_CODE))
        && String::from_utf8_lossy(&output.stderr).contains(SECCOMP_UNAVAILABLE_ERR);
    if unavailable {
        eprintln!(
            "skipping: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    unavailable
}

#[test]
fn guarded_process_survives_trapped_pidfd_open() {
    let output = run_probe(&["--activation", "always", "--simulate-seccomp"]);
    if seccomp_unavailable(&output) {
        return;
    }
    assert!(output.status.success(), "{output:?}");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let expected = format!("syscall={}): ", libc::SYS_pidfd_open);
    let line = stderr
        .lines()
        .find(|line| line.contains(SECCOMP_LINE))
        .unwrap_or_else(|| panic!("no seccomp diagnostic in stderr: {stderr}"));
    assert!(line.starts_with("[sigsys-guard] WARN "), "{line}");
    assert!(line.contains("call=0x"), "{line}");
    assert!(line.contains(&expected), "{line}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("intercepted faults: 1"), "{stdout}");
}

#[test]
fn concurrent_traps_are_each_logged() {
    const THREADS: usize = 8;
    let threads = THREADS.to_string();
    let output = run_probe(&[
        "--activation",
        "always",
        "--simulate-seccomp",
        "--threads",
        threads.as_str(),
    ]);
    if seccomp_unavailable(&output) {
        return;
    }
    assert!(output.status.success(), "{output:?}");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(
        stderr.lines().filter(|line| line.contains(SECCOMP_LINE)).count(),
        THREADS,
        "{stderr}"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(&format!("intercepted faults: {THREADS}")),
        "{stdout}"
    );
    assert_eq!(
        stdout
            .lines()
            .filter(|line| line.starts_with("pidfd_open returned"))
            .count(),
        THREADS
    );
}

#[test]
fn unguarded_process_is_killed_by_sigsys() {
    let output = run_probe(&["--activation", "never", "--simulate-seccomp"]);
    if seccomp_unavailable(&output) {
        return;
    }
    assert_eq!(output.status.signal(), Some(libc::SIGSYS), "{output:?}");
    assert!(!String::from_utf8_lossy(&output.stderr).contains(SECCOMP_LINE));
}
