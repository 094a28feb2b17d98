// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load and validate the optional fcgs TOML configuration.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Tool configuration.
//!
//! Every key is optional; a missing file means built-in defaults. The file
//! is located through `--config`, then `FCGS_CONFIG`, then
//! [`SYSTEM_CONFIG_PATH`].

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::engine::RetryPolicy;
use crate::ping::PingOptions;
use crate::sysfs::SysfsHba;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "FCGS_CONFIG";
/// Configuration read when nothing else is named and the file exists.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/fcgs.toml";

/// Engine retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    /// Attempts per query.
    pub max_attempts: u32,
    /// Pause after a failed attempt.
    pub delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Adapter enumeration and pass-through settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportSection {
    /// Root of the `class/fc_host` tree.
    pub sysfs_root: PathBuf,
    /// Root holding `bsg/fc_hostN`.
    pub dev_root: PathBuf,
    /// SG_IO timeout per pass-through.
    pub timeout_ms: u32,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys"),
            dev_root: PathBuf::from("/dev"),
            timeout_ms: 9000,
        }
    }
}

/// Ping pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PingSection {
    /// Pause between successive echoes.
    pub interval_ms: u64,
    /// Extra attempts after a pass-through failure.
    pub no_response_retries: u32,
}

impl Default for PingSection {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            no_response_retries: 2,
        }
    }
}

/// Parsed configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FcgsConfig {
    /// `[retry]`
    pub retry: RetrySection,
    /// `[transport]`
    pub transport: TransportSection,
    /// `[ping]`
    pub ping: PingSection,
}

impl FcgsConfig {
    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid fcgs configuration TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be >= 1"));
        }
        if self.transport.timeout_ms == 0 {
            return Err(anyhow!("transport.timeout_ms must be >= 1"));
        }
        validate_root("transport.sysfs_root", &self.transport.sysfs_root)?;
        validate_root("transport.dev_root", &self.transport.dev_root)?;
        Ok(())
    }

    /// Engine policy derived from `[retry]`.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            delay: Duration::from_millis(self.retry.delay_ms),
        }
    }

    /// Ping options for `count` echoes starting at `token`.
    #[must_use]
    pub fn ping_options(&self, count: u32, token: u32) -> PingOptions {
        PingOptions {
            count,
            token,
            interval: Duration::from_millis(self.ping.interval_ms),
            no_response_retries: self.ping.no_response_retries,
        }
    }

    /// Adapter enumerator over the configured roots.
    #[must_use]
    pub fn sysfs_hba(&self) -> SysfsHba {
        SysfsHba::new(
            self.transport.sysfs_root.clone(),
            self.transport.dev_root.clone(),
            self.transport.timeout_ms,
        )
    }
}

fn validate_root(label: &str, value: &Path) -> Result<()> {
    if !value.is_absolute() {
        return Err(anyhow!("{label} must be absolute"));
    }
    Ok(())
}

/// Load and validate the configuration at `path`.
pub fn load_config(path: &Path) -> Result<FcgsConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read fcgs config {}", path.display()))?;
    FcgsConfig::from_toml(&text).with_context(|| format!("in {}", path.display()))
}

/// Pick the configuration file: the flag, then the environment value, then
/// `system` when it exists.
#[must_use]
pub fn resolve_config_path_with(
    flag: Option<PathBuf>,
    env_value: Option<OsString>,
    system: &Path,
) -> Option<PathBuf> {
    if flag.is_some() {
        return flag;
    }
    if let Some(value) = env_value.filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(value));
    }
    system.is_file().then(|| system.to_path_buf())
}

/// [`resolve_config_path_with`] against the process environment.
#[must_use]
pub fn resolve_config_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    resolve_config_path_with(
        flag,
        std::env::var_os(CONFIG_ENV),
        Path::new(SYSTEM_CONFIG_PATH),
    )
}

/// Resolve and load, falling back to defaults when no file is named.
pub fn load_effective_config(flag: Option<PathBuf>) -> Result<FcgsConfig> {
    match resolve_config_path(flag) {
        Some(path) => {
            log::debug!("loading configuration from {}", path.display());
            load_config(&path)
        }
        None => Ok(FcgsConfig::default()),
    }
}
