//! Platform version gate.
//!
//! The device API level is queried once per process. Hosts that cannot report
//! one (anything that is not Android, or a device with a garbled
//! `ro.build.version.sdk`) are treated as unaffected.
use std::sync::OnceLock;

static DEVICE_API_LEVEL: OnceLock<Option<u32>> = OnceLock::new();

/// Decides whether the running platform still needs the `SIGSYS` workaround.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionGate {
    last_affected_api_level: u32,
}

impl VersionGate {
    pub const fn new(last_affected_api_level: u32) -> Self {
        Self {
            last_affected_api_level,
        }
    }

    pub fn last_affected_api_level(self) -> u32 {
        self.last_affected_api_level
    }

    /// Gate decision for the current device.
    pub fn is_applicable(self) -> bool {
        self.is_applicable_to(device_api_level())
    }

    pub fn is_applicable_to(self, api_level: Option<u32>) -> bool {
        matches!(api_level, Some(level) if level <= self.last_affected_api_level)
    }
}

/// API level reported by the platform, memoized for the process lifetime.
pub fn device_api_level() -> Option<u32> {
    *DEVICE_API_LEVEL.get_or_init(query_device_api_level)
}

#[cfg(target_os = "android")]
fn query_device_api_level() -> Option<u32> {
    let mut value = [0 as libc::c_char; libc::PROP_VALUE_MAX as usize];
    let len = unsafe {
        libc::__system_property_get(c"ro.build.version.sdk".as_ptr(), value.as_mut_ptr())
    };
    if len <= 0 {
        tracing::debug!("ro.build.version.sdk is not set");
        return None;
    }

    let len = (len as usize).min(value.len());
    let bytes: Vec<u8> = value[..len].iter().map(|&c| c as u8).collect();
    let level = parse_api_level(&bytes);
    if level.is_none() {
        tracing::debug!(
            raw = %String::from_utf8_lossy(&bytes),
            "ignoring unparseable ro.build.version.sdk"
        );
    }
    level
}

#[cfg(not(target_os = "android"))]
fn query_device_api_level() -> Option<u32> {
    None
}

/// Parse a system property value such as `b"30\0"` into an API level.
#[cfg_attr(not(target_os = "android"), allow(dead_code))]
pub(crate) fn parse_api_level(raw: &[u8]) -> Option<u32> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text = std::str::from_utf8(&raw[..end]).ok()?;
    match text.trim().parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(level) => Some(level),
    }
}
