//! Run control state shared between the frame loop and its host.
//!
//! The host (the engine binary, a Ctrl-C handler, a test) can request a
//! clean stop without touching the simulation itself. Bounds and pacing
//! are fixed at construction.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::SimulationBoundsConfig;

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_frames` limit.
    MaxFramesReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// The host asked the loop to stop.
    StopRequested,
    /// No loyal villager is left.
    VillageCollapsed,
    /// The player was killed.
    PlayerDied,
}

/// Shared run control state.
///
/// Wrapped in [`Arc`](std::sync::Arc) and shared between the frame loop
/// and whoever is steering it.
#[derive(Debug)]
pub struct RunControl {
    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Real-time milliseconds between frames.
    frame_interval_ms: u64,

    /// Wall-clock time when the run started.
    started_at: Instant,

    /// Maximum number of frames (0 = unlimited).
    max_frames: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Stop once no loyal villager is left.
    stop_on_collapse: bool,

    /// Reason the run ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl RunControl {
    /// Create control state from configuration.
    pub fn new(frame_interval_ms: u64, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            frame_interval_ms,
            started_at: Instant::now(),
            max_frames: bounds.max_frames,
            max_real_time_seconds: bounds.max_real_time_seconds,
            stop_on_collapse: bounds.stop_on_collapse,
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the run ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// The reason the run ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Frame pacing
    // -----------------------------------------------------------------------

    /// Real-time milliseconds between frames. Zero runs frames back to
    /// back.
    pub const fn frame_interval_ms(&self) -> u64 {
        self.frame_interval_ms
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `max_frames > 0` and `frame >= max_frames`.
    pub const fn frame_limit_reached(&self, frame: u64) -> bool {
        self.max_frames > 0 && frame >= self.max_frames
    }

    /// Whether `max_real_time_seconds > 0` and that much wall-clock time
    /// has passed since the run started.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Whether the run should end when the village collapses.
    pub const fn stop_on_collapse(&self) -> bool {
        self.stop_on_collapse
    }

    /// Whole wall-clock seconds since the run started.
    pub fn elapsed_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Configured max frames.
    pub const fn max_frames(&self) -> u64 {
        self.max_frames
    }

    /// Configured max real-time seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(max_frames: u64) -> SimulationBoundsConfig {
        SimulationBoundsConfig {
            max_frames,
            max_real_time_seconds: 0,
            stop_on_collapse: true,
        }
    }

    #[test]
    fn initial_state_is_running() {
        let control = RunControl::new(16, &bounds(0));
        assert!(!control.is_stop_requested());
        assert_eq!(control.frame_interval_ms(), 16);
    }

    #[test]
    fn stop_request_is_sticky() {
        let control = RunControl::new(0, &bounds(0));
        control.request_stop();
        control.request_stop();
        assert!(control.is_stop_requested());
    }

    #[test]
    fn frame_limit_zero_means_unlimited() {
        let control = RunControl::new(0, &bounds(0));
        assert!(!control.frame_limit_reached(999_999));
    }

    #[test]
    fn frame_limit_reached() {
        let control = RunControl::new(0, &bounds(100));
        assert!(!control.frame_limit_reached(99));
        assert!(control.frame_limit_reached(100));
        assert!(control.frame_limit_reached(101));
    }

    #[test]
    fn time_limit_zero_means_unlimited() {
        let control = RunControl::new(0, &bounds(0));
        assert!(!control.time_limit_reached());
    }

    #[tokio::test]
    async fn end_reason_is_recorded() {
        let control = RunControl::new(0, &bounds(0));
        assert_eq!(control.end_reason().await, None);
        control
            .set_end_reason(SimulationEndReason::VillageCollapsed)
            .await;
        assert_eq!(
            control.end_reason().await,
            Some(SimulationEndReason::VillageCollapsed)
        );
    }
}
