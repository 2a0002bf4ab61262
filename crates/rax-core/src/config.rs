//! Process-wide configuration
//!
//! Read once from the environment the first time it is needed:
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `RAX_ENABLE_X64` | `enable_x64` | `false` |
//! | `RAX_CPU_DEVICE_COUNT` | `cpu_device_count` | `8` |
//! | `RAX_PROCESS_INDEX` | `process_index` | `0` |

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Keep 64-bit dtypes instead of canonicalizing them to 32 bits.
    pub enable_x64: bool,
    /// Number of host devices the CPU backend exposes for sharding.
    pub cpu_device_count: usize,
    /// Index of this process; shards on devices of other processes are not addressable.
    pub process_index: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_x64: false,
            cpu_device_count: 8,
            process_index: 0,
        }
    }
}

static GLOBAL: OnceLock<Config> = OnceLock::new();

impl Config {
    /// Builds a config from `RAX_*` environment variables, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let enable_x64 = lookup("RAX_ENABLE_X64")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(defaults.enable_x64);
        let cpu_device_count = lookup("RAX_CPU_DEVICE_COUNT")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.cpu_device_count);
        let process_index = lookup("RAX_PROCESS_INDEX")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults.process_index);
        Self {
            enable_x64,
            cpu_device_count,
            process_index,
        }
    }

    /// The process-wide config, loaded on first access.
    pub fn global() -> &'static Config {
        GLOBAL.get_or_init(|| {
            let config = Self::from_env();
            tracing::debug!(?config, "loaded rax configuration");
            config
        })
    }
}
