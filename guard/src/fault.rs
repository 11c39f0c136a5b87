//! Decoded `SIGSYS` payload.
use std::fmt;

use crate::message::describe_errno;

/// `si_code` the kernel uses for `SECCOMP_RET_TRAP` deliveries.
pub const SYS_SECCOMP: i32 = 1;

/// `AUDIT_ARCH_*` value reported in `si_arch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuditArch(pub u32);

impl AuditArch {
    pub const X86: Self = Self(0x4000_0003);
    pub const X86_64: Self = Self(0xc000_003e);
    pub const ARM: Self = Self(0x4000_0028);
    pub const AARCH64: Self = Self(0xc000_00b7);
    pub const RISCV64: Self = Self(0xc000_00f3);

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::X86 => Some("x86"),
            Self::X86_64 => Some("x86_64"),
            Self::ARM => Some("arm"),
            Self::AARCH64 => Some("aarch64"),
            Self::RISCV64 => Some("riscv64"),
            _ => None,
        }
    }
}

impl fmt::Display for AuditArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.0;
        match self.name() {
            Some(name) => write!(f, "{raw:#x}/{name}"),
            None => write!(f, "{raw:#x}"),
        }
    }
}

/// One delivery of `SIGSYS`, classified by its `si_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultEvent {
    /// The seccomp policy trapped a syscall.
    Seccomp {
        call_addr: usize,
        arch: AuditArch,
        syscall: i32,
        errno: i32,
    },
    /// Sent by `kill`/`tgkill`/`raise` or any other non-seccomp source.
    Other { errno: i32 },
}

impl FaultEvent {
    pub fn errno(self) -> i32 {
        match self {
            Self::Seccomp { errno, .. } | Self::Other { errno } => errno,
        }
    }

    pub fn is_seccomp(self) -> bool {
        matches!(self, Self::Seccomp { .. })
    }

    /// Decode the `siginfo_t` handed to an `SA_SIGINFO` handler.
    ///
    /// # Safety
    ///
    /// `info` must be null or point to a valid `siginfo_t` delivered for
    /// `SIGSYS`.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub unsafe fn from_siginfo(info: *const libc::siginfo_t) -> Option<Self> {
        if info.is_null() {
            return None;
        }
        // SAFETY: the caller guarantees `info` is a live siginfo_t, which is
        // always larger than the `_sigsys` prefix read here.
        let raw = unsafe { &*info.cast::<SigsysInfo>() };
        let event = if raw.si_code == SYS_SECCOMP {
            Self::Seccomp {
                call_addr: raw.call_addr as usize,
                arch: AuditArch(raw.arch),
                syscall: raw.syscall,
                errno: raw.si_errno,
            }
        } else {
            Self::Other {
                errno: raw.si_errno,
            }
        };
        Some(event)
    }
}

impl fmt::Display for FaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Seccomp {
                call_addr,
                arch,
                syscall,
                errno,
            } => {
                let description = describe_errno(errno);
                write!(
                    f,
                    "Received seccomp SIGSYS (call={call_addr:#x}, arch={arch}, syscall={syscall}): {description}"
                )
            }
            Self::Other { errno } => {
                let description = describe_errno(errno);
                write!(f, "Received non-seccomp SIGSYS: {description}")
            }
        }
    }
}

/// Leading fields of the kernel's `siginfo_t` with the `_sigsys` union member
/// selected. `libc::siginfo_t` does not expose these.
#[cfg(any(target_os = "linux", target_os = "android"))]
#[repr(C)]
struct SigsysInfo {
    si_signo: libc::c_int,
    #[cfg(not(any(target_arch = "mips", target_arch = "mips64")))]
    si_errno: libc::c_int,
    si_code: libc::c_int,
    #[cfg(any(target_arch = "mips", target_arch = "mips64"))]
    si_errno: libc::c_int,
    call_addr: *mut libc::c_void,
    syscall: libc::c_int,
    arch: libc::c_uint,
}
