//! Recorder and playback configuration, and validation.
//!
//! Both configs are plain structs with defaults matching the nominal
//! 20 Hz tick rate. [`validate()`](RecorderConfig::validate) is called by
//! the constructors; a config that fails it never reaches a thread.

use flashback_replay::LoadMode;

// ── RecorderConfig ─────────────────────────────────────────────────

/// Configuration for a [`Recorder`](crate::Recorder).
#[derive(Clone, Debug, PartialEq)]
pub struct RecorderConfig {
    /// Rate of the tick counter thread. Default: 20.0.
    pub tick_rate_hz: f64,
    /// Pending ticks are flushed whenever the tick counter reaches a
    /// multiple of this. Default: 3600 (three minutes at 20 Hz).
    pub flush_interval_ticks: u32,
    /// Whether [`Recorder::start`](crate::Recorder::start) runs the entity
    /// movement sampler. Default: true.
    pub record_entity_movement: bool,
    /// Smallest position or rotation change the sampler records.
    /// Default: 0.001.
    pub movement_threshold: f64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20.0,
            flush_interval_ticks: 3600,
            record_entity_movement: true,
            movement_threshold: 0.001,
        }
    }
}

impl RecorderConfig {
    /// Check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate(self.tick_rate_hz)?;
        if self.flush_interval_ticks == 0 {
            return Err(ConfigError::InvalidFlushInterval);
        }
        if !self.movement_threshold.is_finite() || self.movement_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold {
                value: self.movement_threshold,
            });
        }
        Ok(())
    }
}

// ── PlaybackConfig ─────────────────────────────────────────────────

/// Configuration for a [`Playback`](crate::Playback).
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Ticks per second at speed 1.0. Default: 20.0.
    pub tick_rate_hz: f64,
    /// Scheduler timer frequency; must not be below `tick_rate_hz`.
    /// Default: 100.0.
    pub scheduler_hz: f64,
    /// Speed multiplier at start. Default: 1.0.
    pub initial_speed: f64,
    /// Whether playback starts paused. Default: false.
    pub start_paused: bool,
    /// How [`Playback::open`](crate::Playback::open) treats corrupt logs.
    /// Default: [`LoadMode::Strict`].
    pub load_mode: LoadMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20.0,
            scheduler_hz: 100.0,
            initial_speed: 1.0,
            start_paused: false,
            load_mode: LoadMode::Strict,
        }
    }
}

impl PlaybackConfig {
    /// Check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate(self.tick_rate_hz)?;
        check_rate(self.scheduler_hz)?;
        if self.scheduler_hz < self.tick_rate_hz {
            return Err(ConfigError::SchedulerTooSlow {
                scheduler_hz: self.scheduler_hz,
                tick_rate_hz: self.tick_rate_hz,
            });
        }
        check_speed(self.initial_speed)
    }
}

fn check_rate(value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTickRate { value })
    }
}

pub(crate) fn check_speed(value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSpeed { value })
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// A configuration value is out of range.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A rate is NaN, infinite, zero or negative.
    #[error("invalid rate {value} Hz: must be finite and positive")]
    InvalidTickRate {
        /// The rejected value.
        value: f64,
    },
    /// The scheduler would fire less often than ticks are due.
    #[error("scheduler at {scheduler_hz} Hz is slower than the {tick_rate_hz} Hz tick rate")]
    SchedulerTooSlow {
        /// Configured scheduler frequency.
        scheduler_hz: f64,
        /// Configured tick rate.
        tick_rate_hz: f64,
    },
    /// `flush_interval_ticks` is zero.
    #[error("flush interval must be at least one tick")]
    InvalidFlushInterval,
    /// A speed is NaN, infinite, zero or negative.
    #[error("invalid speed {value}: must be finite and positive")]
    InvalidSpeed {
        /// The rejected value.
        value: f64,
    },
    /// The movement threshold is negative or not finite.
    #[error("invalid movement threshold {value}")]
    InvalidThreshold {
        /// The rejected value.
        value: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RecorderConfig::default().validate().is_ok());
        assert!(PlaybackConfig::default().validate().is_ok());
    }

    #[test]
    fn recorder_rejects_bad_values() {
        let bad_rate = RecorderConfig {
            tick_rate_hz: f64::NAN,
            ..RecorderConfig::default()
        };
        assert!(matches!(
            bad_rate.validate(),
            Err(ConfigError::InvalidTickRate { .. })
        ));

        let zero_flush = RecorderConfig {
            flush_interval_ticks: 0,
            ..RecorderConfig::default()
        };
        assert_eq!(zero_flush.validate(), Err(ConfigError::InvalidFlushInterval));

        let negative = RecorderConfig {
            movement_threshold: -1.0,
            ..RecorderConfig::default()
        };
        assert_eq!(
            negative.validate(),
            Err(ConfigError::InvalidThreshold { value: -1.0 })
        );
    }

    #[test]
    fn playback_rejects_slow_scheduler_and_bad_speed() {
        let slow = PlaybackConfig {
            scheduler_hz: 10.0,
            ..PlaybackConfig::default()
        };
        assert!(matches!(
            slow.validate(),
            Err(ConfigError::SchedulerTooSlow { .. })
        ));

        for speed in [0.0, -1.0, f64::INFINITY] {
            let config = PlaybackConfig {
                initial_speed: speed,
                ..PlaybackConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidSpeed { .. })
            ));
        }
    }
}
