//! Engine configuration and the process-wide frame rate.
//!
//! Cooldowns and movement are measured in ticks, so every conversion between
//! seconds and ticks goes through [`frame_rate`]. The rate is fixed the first
//! time it is read or installed and cannot change for the rest of the process.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ticks per simulated second when nothing else is configured.
pub const DEFAULT_FRAME_RATE: u32 = 30;

static FRAME_RATE: OnceLock<u32> = OnceLock::new();

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("frame rate must be positive, got {rate}")]
    InvalidFrameRate { rate: u32 },

    #[error("frame rate already fixed at {current}, cannot change it to {requested}")]
    FrameRateAlreadySet { current: u32, requested: u32 },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Frame rate
// ---------------------------------------------------------------------------

/// Fix the process-wide frame rate.
///
/// Installing the value that is already in effect is a no-op.
///
/// # Errors
///
/// [`ConfigError::InvalidFrameRate`] for zero, and
/// [`ConfigError::FrameRateAlreadySet`] if a different rate was installed (or
/// the default was locked in by an earlier [`frame_rate`] call).
pub fn init_frame_rate(rate: u32) -> Result<u32, ConfigError> {
    if rate == 0 {
        return Err(ConfigError::InvalidFrameRate { rate });
    }
    let current = *FRAME_RATE.get_or_init(|| {
        debug!(rate, "frame rate fixed");
        rate
    });
    if current != rate {
        return Err(ConfigError::FrameRateAlreadySet {
            current,
            requested: rate,
        });
    }
    Ok(current)
}

/// Ticks per simulated second. Locks in [`DEFAULT_FRAME_RATE`] if nothing
/// was installed yet.
pub fn frame_rate() -> u32 {
    *FRAME_RATE.get_or_init(|| DEFAULT_FRAME_RATE)
}

/// Seconds per tick.
pub fn frame_duration() -> f32 {
    1.0 / frame_rate() as f32
}

/// Convert a duration in seconds to whole ticks at the current frame rate.
pub fn seconds_to_ticks(seconds: f32) -> u32 {
    (seconds * frame_rate() as f32).round().max(0.0) as u32
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Startup configuration, usually read from a JSON file.
///
/// Missing fields take their defaults:
///
/// ```
/// use dungeon_engine::config::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "seed": 7 }"#).unwrap();
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.frame_rate, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ticks per simulated second.
    pub frame_rate: u32,
    /// Seed for every random decision the simulation makes.
    pub seed: u64,
    /// Base directory that animation frame paths are saved relative to.
    pub resource_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            seed: 0,
            resource_root: PathBuf::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 {
            return Err(ConfigError::InvalidFrameRate {
                rate: self.frame_rate,
            });
        }
        Ok(())
    }

    /// Validate and install the frame rate process-wide.
    pub fn install(&self) -> Result<(), ConfigError> {
        self.validate()?;
        init_frame_rate(self.frame_rate)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn zero_frame_rate_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "frame_rate": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFrameRate { rate: 0 }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = EngineConfig::from_json_str("{ frame_rate").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn default_rate_can_be_reinstalled() {
        // Every unit test in this crate runs at the default rate.
        assert_eq!(frame_rate(), DEFAULT_FRAME_RATE);
        assert!(init_frame_rate(DEFAULT_FRAME_RATE).is_ok());
        assert!(matches!(
            init_frame_rate(DEFAULT_FRAME_RATE + 1),
            Err(ConfigError::FrameRateAlreadySet { .. })
        ));
    }

    #[test]
    fn seconds_convert_to_rounded_ticks() {
        assert_eq!(seconds_to_ticks(2.0), 60);
        assert_eq!(seconds_to_ticks(0.5), 15);
        assert_eq!(seconds_to_ticks(-1.0), 0);
    }
}
