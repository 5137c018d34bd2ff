//! Integrity Configuration
//!
//! Passed by value to each component at construction. There is no global
//! configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default checkpoint interval (ms).
pub const DEFAULT_CHECKPOINT_INTERVAL_MS: u64 = 150;

/// Default advisory cap on events per checkpoint.
pub const DEFAULT_MAX_EVENTS_PER_CHECKPOINT: usize = 50;

/// Default minimum distance for a position sample to count as movement.
pub const DEFAULT_MOVEMENT_THRESHOLD: f64 = 5.0;

/// Default maximum player speed (units per millisecond).
pub const DEFAULT_MAX_PLAYER_SPEED: f64 = 0.5;

/// Tunables consumed by the chain and the verifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntegrityConfig {
    /// Minimum time between automatic checkpoints (ms).
    #[serde(rename = "checkpointInterval")]
    pub checkpoint_interval_ms: u64,

    /// Advisory cap on pending events. Exceeding it is reported, never enforced.
    pub max_events_per_checkpoint: usize,

    /// Minimum distance between samples for the event normalizer to emit a move.
    pub movement_threshold: f64,

    /// Maximum plausible speed in units per millisecond.
    pub max_player_speed: f64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval_ms: DEFAULT_CHECKPOINT_INTERVAL_MS,
            max_events_per_checkpoint: DEFAULT_MAX_EVENTS_PER_CHECKPOINT,
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
            max_player_speed: DEFAULT_MAX_PLAYER_SPEED,
        }
    }
}

impl IntegrityConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable variables keep their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            checkpoint_interval_ms: env_or("INTEGRITY_CHECKPOINT_INTERVAL_MS", defaults.checkpoint_interval_ms),
            max_events_per_checkpoint: env_or(
                "INTEGRITY_MAX_EVENTS_PER_CHECKPOINT",
                defaults.max_events_per_checkpoint,
            ),
            movement_threshold: env_or("INTEGRITY_MOVEMENT_THRESHOLD", defaults.movement_threshold),
            max_player_speed: env_or("INTEGRITY_MAX_PLAYER_SPEED", defaults.max_player_speed),
        }
    }

    /// Set the checkpoint interval.
    pub fn with_checkpoint_interval(mut self, millis: u64) -> Self {
        self.checkpoint_interval_ms = millis;
        self
    }

    /// Set the maximum player speed.
    pub fn with_max_player_speed(mut self, speed: f64) -> Self {
        self.max_player_speed = speed;
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checkpoint_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if !self.max_player_speed.is_finite() || self.max_player_speed <= 0.0 {
            return Err(ConfigError::InvalidSpeed(self.max_player_speed));
        }
        if !self.movement_threshold.is_finite() || self.movement_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.movement_threshold));
        }
        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Interval of zero would seal on every event.
    #[error("checkpoint interval must be greater than zero")]
    ZeroInterval,
    /// Speed limit is not a positive finite number.
    #[error("max player speed must be positive and finite, got {0}")]
    InvalidSpeed(f64),
    /// Threshold is negative or not finite.
    #[error("movement threshold must be non-negative and finite, got {0}")]
    InvalidThreshold(f64),
}
