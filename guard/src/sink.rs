//! Diagnostic output that is safe to use from a signal handler.
use std::ffi::CStr;
use std::fmt::Write;

use strum_macros::Display;

use crate::message::MESSAGE_CAPACITY;
use crate::message::MessageBuf;

/// `liblog` tag on Android; the stderr line prefix elsewhere.
pub const LOG_TAG: &CStr = c"sigsys-guard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
}

/// Destination for messages emitted from signal context.
///
/// Implementations run on whatever thread took the signal, possibly in the
/// middle of `malloc` or while holding an arbitrary lock. They must not
/// allocate, block, or lock.
pub trait FaultSink: Sync {
    fn emit(&self, level: Level, message: &str);
}

/// `liblog` on Android, a single `write(2)` to stderr elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformSink;

impl FaultSink for PlatformSink {
    fn emit(&self, level: Level, message: &str) {
        imp::emit(level, message);
    }
}

#[cfg(target_os = "android")]
mod imp {
    use super::*;

    const ANDROID_LOG_INFO: libc::c_int = 4;
    const ANDROID_LOG_WARN: libc::c_int = 5;

    #[link(name = "log")]
    unsafe extern "C" {
        fn __android_log_write(
            prio: libc::c_int,
            tag: *const libc::c_char,
            text: *const libc::c_char,
        ) -> libc::c_int;
    }

    pub(super) fn emit(level: Level, message: &str) {
        let priority = match level {
            Level::Info => ANDROID_LOG_INFO,
            Level::Warn => ANDROID_LOG_WARN,
        };
        let mut text = MessageBuf::<MESSAGE_CAPACITY>::new();
        let _ = text.write_str(message);
        unsafe {
            __android_log_write(priority, LOG_TAG.as_ptr(), text.as_c_str().as_ptr());
        }
    }
}

#[cfg(not(target_os = "android"))]
mod imp {
    use super::*;

    // Room for the "[sigsys-guard] WARN " prefix and the newline.
    const LINE_CAPACITY: usize = MESSAGE_CAPACITY + 32;

    pub(super) fn emit(level: Level, message: &str) {
        let line = format_line(level, message);
        write_stderr(line.as_str().as_bytes());
    }

    pub(super) fn format_line(level: Level, message: &str) -> MessageBuf<LINE_CAPACITY> {
        let mut line = MessageBuf::<LINE_CAPACITY>::new();
        let tag = LOG_TAG.to_str().unwrap_or_default();
        let _ = write!(line, "[{tag}] {level} ");
        let mut body = MessageBuf::<MESSAGE_CAPACITY>::new();
        let _ = body.write_str(message);
        let _ = line.write_str(body.as_str());
        let _ = line.write_char('\n');
        line
    }

    fn write_stderr(mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let written = unsafe {
                libc::write(
                    libc::STDERR_FILENO,
                    bytes.as_ptr().cast::<libc::c_void>(),
                    bytes.len(),
                )
            };
            if written > 0 {
                bytes = &bytes[(written as usize).min(bytes.len())..];
            } else if written < 0
                && std::io::Error::last_os_error().raw_os_error() == Some(libc::EINTR)
            {
                continue;
            } else {
                return;
            }
        }
    }
}
