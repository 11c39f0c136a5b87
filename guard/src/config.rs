use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use strum_macros::Display;
use strum_macros::EnumString;

use crate::error::GuardError;
use crate::error::Result;

/// Android 11. The app seccomp policy only allows `pidfd_open` from API 31 on.
pub const DEFAULT_LAST_AFFECTED_API_LEVEL: u32 = 30;

pub const ACTIVATION_ENV_VAR: &str = "SIGSYS_GUARD_ACTIVATION";
pub const LAST_AFFECTED_API_LEVEL_ENV_VAR: &str = "SIGSYS_GUARD_LAST_AFFECTED_API_LEVEL";

/// Whether the guard consults the platform version before installing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, EnumString, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Activation {
    /// Install only when the device API level is at or below the threshold.
    #[default]
    Auto,
    /// Install regardless of the platform version.
    Always,
    /// Never install.
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    pub activation: Activation,
    /// Highest API level that still needs the workaround.
    pub last_affected_api_level: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            activation: Activation::Auto,
            last_affected_api_level: DEFAULT_LAST_AFFECTED_API_LEVEL,
        }
    }
}

impl GuardConfig {
    /// Defaults overlaid with the `SIGSYS_GUARD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|source| GuardError::ConfigParse { source })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| GuardError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `SIGSYS_GUARD_ACTIVATION` and `SIGSYS_GUARD_LAST_AFFECTED_API_LEVEL`
    /// on top of `self`. Unset or empty variables leave the field untouched.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ACTIVATION_ENV_VAR).filter(|val| !val.trim().is_empty()) {
            self.activation = parse_activation(ACTIVATION_ENV_VAR, &value)?;
        }
        if let Some(value) =
            lookup(LAST_AFFECTED_API_LEVEL_ENV_VAR).filter(|val| !val.trim().is_empty())
        {
            self.last_affected_api_level =
                parse_api_level(LAST_AFFECTED_API_LEVEL_ENV_VAR, &value)?;
        }
        Ok(self)
    }
}

pub fn parse_activation(key: &str, value: &str) -> Result<Activation> {
    Activation::from_str(value.trim()).map_err(|err| GuardError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
        reason: err.to_string(),
    })
}

pub fn parse_api_level(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|err| GuardError::InvalidConfig {
            key: key.to_string(),
            value: value.to_string(),
            reason: err.to_string(),
        })
}
