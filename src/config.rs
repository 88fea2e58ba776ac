//! Configuration file support.
//!
//! hyprmru reads an optional JSON configuration file from
//! `$XDG_CONFIG_HOME/hyprmru/config.json` (falling back to
//! `~/.config/hyprmru/config.json`).  Every field has a sensible default, so
//! the file only needs to contain the values you want to override.
//!
//! All values are read once at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
///
/// Every field is optional; a minimal `{}` file is valid and all values
/// fall back to their compiled-in defaults.
///
/// # Example
///
/// ```json
/// {
///   "history_capacity": 30,
///   "display_count": 8,
///   "poll_interval_ms": 250,
///   "thumbnails": { "max_width": 240, "max_height": 160 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many windows the history remembers.  Default: `20`.
    pub history_capacity: usize,
    /// How many windows the overlay shows.  Default: `10`.
    pub display_count: usize,
    /// Interval of the focus poll (ms).  Default: `500`.
    pub poll_interval_ms: u64,
    /// Interval of the stale-entry sweep (ms).  Default: `5000`.
    pub sweep_interval_ms: u64,
    /// Advance once right after activation so that a quick tap switches to
    /// the previous window.  Default: `false`.
    pub select_previous_on_activate: bool,
    /// Thumbnail capture and caching.
    pub thumbnails: ThumbnailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_capacity: 20,
            display_count: 10,
            poll_interval_ms: 500,
            sweep_interval_ms: 5000,
            select_previous_on_activate: false,
            thumbnails: ThumbnailConfig::default(),
        }
    }
}

/// Thumbnail capture and caching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Capture thumbnails at all.  When `false` every entry gets a
    /// placeholder.  Default: `true`.
    pub enabled: bool,
    /// Maximum number of cached thumbnails.  Default: `20`.
    pub capacity: usize,
    /// Bounding box thumbnails are scaled into (pixels).
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 20,
            max_width: 320,
            max_height: 200,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
