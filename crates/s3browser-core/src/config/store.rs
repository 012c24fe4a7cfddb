//! Durable store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Embedded key-value store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_path")]
    pub path: String,
    /// Maximum size of the memory map in megabytes.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,
    /// Number of attempts made to open the environment at startup.
    #[serde(default = "default_open_attempts")]
    pub open_attempts: u32,
    /// Base backoff between open attempts; attempt `n` waits `n` times this.
    #[serde(default = "default_open_backoff_ms")]
    pub open_backoff_ms: u64,
}

impl StoreConfig {
    /// Store settings rooted at `path`, everything else defaulted.
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Map size in bytes.
    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.max(1).saturating_mul(1024 * 1024)
    }

    /// Backoff to wait after the given failed attempt (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.open_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            map_size_mb: default_map_size_mb(),
            open_attempts: default_open_attempts(),
            open_backoff_ms: default_open_backoff_ms(),
        }
    }
}

fn default_path() -> String {
    "data/queue".to_string()
}

fn default_map_size_mb() -> usize {
    256
}

fn default_open_attempts() -> u32 {
    3
}

fn default_open_backoff_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_linearly() {
        let config = StoreConfig::default();
        assert_eq!(config.backoff_after(1), Duration::from_secs(1));
        assert_eq!(config.backoff_after(2), Duration::from_secs(2));
    }

    #[test]
    fn test_map_size_never_zero() {
        let config = StoreConfig {
            map_size_mb: 0,
            ..StoreConfig::default()
        };
        assert_eq!(config.map_size_bytes(), 1024 * 1024);
    }

    #[test]
    fn test_map_size_saturates() {
        let config = StoreConfig {
            map_size_mb: usize::MAX,
            ..StoreConfig::default()
        };
        assert_eq!(config.map_size_bytes(), usize::MAX);
    }
}
