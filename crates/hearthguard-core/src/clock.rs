//! Simulation clock and the day/night cycle.
//!
//! The clock is the single source of truth for simulated time. It counts
//! frames, accumulates elapsed seconds, and walks the day/night cycle.
//! Each day starts in daylight; the last `night_fraction` of the day is
//! night.
//!
//! # Design Principles
//!
//! - Frame and day counters use checked arithmetic (no silent overflow).
//! - Boundaries are crossed one at a time, so a single large step that
//!   spans several boundaries reports every one of them in order.
//! - The clock only reports transitions. What happens at nightfall is
//!   decided by the frame tick.

use hearthguard_types::SimEvent;

use crate::config::ClockConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Frame counter would overflow.
    #[error("frame counter overflow: cannot advance beyond u64::MAX")]
    FrameOverflow,

    /// Day counter would overflow.
    #[error("day counter overflow: cannot advance beyond u32::MAX")]
    DayOverflow,

    /// Invalid clock configuration (e.g. zero day length).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Frame counter plus the day/night cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    /// Frames advanced so far.
    frame: u64,

    /// Simulated seconds since the start.
    elapsed: f64,

    /// Current day (1-indexed).
    day: u32,

    /// Seconds into the current day.
    time_in_day: f64,

    /// Whether the current day has passed into night.
    is_night: bool,

    /// Length of a full day in seconds.
    day_length: f64,

    /// Seconds into the day at which night begins.
    night_start: f64,
}

impl SimulationClock {
    /// Create a clock at frame 0, the start of day 1.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if the day length is not
    /// positive or the night fraction is outside `[0, 1)`.
    pub fn new(config: &ClockConfig) -> Result<Self, ClockError> {
        if config.day_length_seconds.is_nan() || config.day_length_seconds <= 0.0 {
            return Err(ClockError::InvalidConfig {
                reason: "day_length_seconds must be greater than zero".to_owned(),
            });
        }
        if !(0.0..1.0).contains(&config.night_fraction) {
            return Err(ClockError::InvalidConfig {
                reason: "night_fraction must be within [0, 1)".to_owned(),
            });
        }

        Ok(Self {
            frame: 0,
            elapsed: 0.0,
            day: 1,
            time_in_day: 0.0,
            is_night: false,
            day_length: config.day_length_seconds,
            night_start: config.day_length_seconds * (1.0 - config.night_fraction),
        })
    }

    /// Advance by one frame of `dt` seconds and return the boundaries
    /// crossed, in order.
    ///
    /// Negative or NaN steps count as zero.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::FrameOverflow`] or [`ClockError::DayOverflow`]
    /// if a counter would overflow.
    pub fn advance(&mut self, dt: f32) -> Result<Vec<SimEvent>, ClockError> {
        self.frame = self.frame.checked_add(1).ok_or(ClockError::FrameOverflow)?;

        let mut remaining = f64::from(dt).max(0.0);
        self.elapsed += remaining;

        let mut crossed = Vec::new();
        loop {
            let boundary = if self.is_night {
                self.day_length
            } else {
                self.night_start
            };
            let to_boundary = boundary - self.time_in_day;
            if remaining < to_boundary {
                self.time_in_day += remaining;
                break;
            }
            remaining -= to_boundary;

            if self.is_night {
                self.day = self.day.checked_add(1).ok_or(ClockError::DayOverflow)?;
                self.time_in_day = 0.0;
                self.is_night = false;
                crossed.push(SimEvent::DayBegan { day: self.day });
            } else {
                self.time_in_day = self.night_start;
                self.is_night = true;
                crossed.push(SimEvent::NightBegan { day: self.day });
            }
        }
        Ok(crossed)
    }

    /// Frames advanced so far.
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated seconds since the start.
    pub const fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    /// Current day (1-indexed).
    pub const fn day(&self) -> u32 {
        self.day
    }

    /// Whether it is night.
    pub const fn is_night(&self) -> bool {
        self.is_night
    }

    /// Progress through the current day, in `[0, 1)`.
    pub const fn time_of_day(&self) -> f64 {
        (self.time_in_day / self.day_length).clamp(0.0, 1.0)
    }
}
