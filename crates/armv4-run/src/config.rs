//! Runner configuration loaded from an optional TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use armv4_core::CoreConfig;
use serde::{Deserialize, Serialize};

/// Default timer reload value in polls.
pub const DEFAULT_TIMER_INTERVAL: u32 = 100_000;
/// Physical address the device tree blob is copied to.
pub const DEFAULT_DTB_ADDRESS: u32 = 0x0100_0000;
/// Offset of the kernel image from the start of RAM.
pub const DEFAULT_KERNEL_OFFSET: u32 = 0x8000;

/// Everything the host needs to build a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Core settings.
    pub core: CoreConfig,
    /// Timer reload value.
    pub timer_interval: u32,
    /// Linux boot: DTB physical address.
    pub dtb_address: u32,
    /// Linux boot: kernel load offset from RAM start.
    pub kernel_offset: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            timer_interval: DEFAULT_TIMER_INTERVAL,
            dtb_address: DEFAULT_DTB_ADDRESS,
            kernel_offset: DEFAULT_KERNEL_OFFSET,
        }
    }
}

impl RunnerConfig {
    /// Parses a configuration from TOML text; missing keys take defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid runner configuration")?;
        config
            .core
            .validate()
            .context("invalid [core] configuration")?;
        Ok(config)
    }

    /// Reads and parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }
}
