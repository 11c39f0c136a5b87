//! Allocation-free text formatting for use inside a signal handler.
use std::ffi::CStr;
use std::fmt;
use std::fmt::Write;

pub(crate) const MESSAGE_CAPACITY: usize = 256;
pub(crate) const ERRNO_TEXT_CAPACITY: usize = 128;

/// Fixed-capacity, always NUL-terminated text buffer that can be filled with
/// `write!`. Output past the capacity is dropped at a char boundary; writes
/// never fail.
pub(crate) struct MessageBuf<const N: usize = MESSAGE_CAPACITY> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> MessageBuf<N> {
    pub(crate) const fn new() -> Self {
        Self {
            bytes: [0; N],
            len: 0,
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        // Only whole UTF-8 sequences are ever copied in.
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    #[cfg_attr(not(target_os = "android"), allow(dead_code))]
    pub(crate) fn as_c_str(&self) -> &CStr {
        CStr::from_bytes_until_nul(&self.bytes).unwrap_or(c"")
    }
}

impl<const N: usize> Write for MessageBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // One byte is reserved for the terminating NUL.
        let room = N.saturating_sub(1).saturating_sub(self.len);
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }
        if N == 0 {
            return Ok(());
        }

        self.bytes[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        self.bytes[self.len] = 0;
        Ok(())
    }
}

impl<const N: usize> fmt::Display for MessageBuf<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> fmt::Debug for MessageBuf<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// Human-readable description of `errno` via `strerror_r(3)`.
pub(crate) fn describe_errno(errno: i32) -> MessageBuf<ERRNO_TEXT_CAPACITY> {
    let mut raw = [0u8; ERRNO_TEXT_CAPACITY];
    let rc = unsafe { libc::strerror_r(errno, raw.as_mut_ptr().cast(), raw.len()) };

    let mut text = MessageBuf::new();
    let described = if rc == 0 {
        CStr::from_bytes_until_nul(&raw)
            .ok()
            .and_then(|description| description.to_str().ok())
            .filter(|description| !description.is_empty())
    } else {
        None
    };
    let _ = match described {
        Some(description) => text.write_str(description),
        None => write!(text, "Unknown error {errno}"),
    };
    text
}
