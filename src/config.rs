//! Player configuration
//!
//! Defaults reproduce the stock player: reconnect three seconds after the
//! transport drops, and keep a hidden player pinned one second behind the
//! live edge.
//!
//! ```rust
//! use wsmp4f::PlayerConfig;
//!
//! let config = PlayerConfig::from_yaml_str("reconnect_delay_ms: 5000\n").unwrap();
//! assert_eq!(config.reconnect_delay().as_millis(), 5000);
//! assert!(config.catch_up_live_edge);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{PlayerError, Result};

/// Tunables for a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// Delay between an unexpected transport close and the next connect
    pub reconnect_delay_ms: u64,

    /// Seek a hidden surface back to the live edge as media arrives
    pub catch_up_live_edge: bool,

    /// How far behind the buffered end the catch-up seek lands
    pub live_edge_offset_ms: u64,

    /// Capacity of the playback event broadcast channel
    pub event_capacity: usize,

    /// Upper bound on waiting for a transport to close during teardown
    pub close_timeout_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 3_000,
            catch_up_live_edge: true,
            live_edge_offset_ms: 1_000,
            event_capacity: 64,
            close_timeout_ms: 1_000,
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| PlayerError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reconnect_delay_ms == 0 {
            return Err(PlayerError::config("reconnect_delay_ms must be greater than zero"));
        }
        if self.event_capacity == 0 {
            return Err(PlayerError::config("event_capacity must be greater than zero"));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn live_edge_offset(&self) -> Duration {
        Duration::from_millis(self.live_edge_offset_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}
