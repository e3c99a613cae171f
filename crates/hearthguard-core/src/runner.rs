//! Frame loop runner with run controls.
//!
//! [`run_simulation`] drives [`Simulation::tick`] with support for:
//!
//! - **Bounded runs**: stop after `max_frames` or `max_real_time_seconds`
//! - **Real-time pacing**: a fixed sleep between frames
//! - **Village collapse**: stop once no loyal villager is left
//! - **Player death**: stop when the player is killed
//! - **Clean shutdown** on request from the host
//!
//! The runner only owns the control plane. Everything that happens inside
//! a frame lives in [`crate::tick`].

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{info, warn};

use crate::control::{RunControl, SimulationEndReason};
use crate::tick::{FrameSummary, Simulation, TickError};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A frame failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last frame summary, if any frame completed.
    pub final_summary: Option<FrameSummary>,
    /// Total number of frames executed.
    pub total_frames: u64,
}

/// Callback invoked after each frame completes.
///
/// The callback may act on the simulation between frames: the engine uses
/// it to send raid waves and report status.
pub trait TickCallback: Send {
    /// Called after a frame completes successfully.
    fn on_frame(&mut self, summary: &FrameSummary, simulation: &mut Simulation);
}

/// A no-op callback for testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_frame(&mut self, _summary: &FrameSummary, _simulation: &mut Simulation) {}
}

/// Run the frame loop until a termination condition is met.
///
/// Each frame advances the simulation by `world.frame_seconds` of
/// simulated time.
///
/// # Errors
///
/// Returns [`RunnerError`] if a frame fails unrecoverably.
pub async fn run_simulation(
    simulation: &mut Simulation,
    control: &Arc<RunControl>,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let frame_seconds = simulation.config().world.frame_seconds;
    let mut last_summary: Option<FrameSummary> = None;
    let mut total_frames: u64 = 0;

    info!(
        max_frames = control.max_frames(),
        max_real_time_seconds = control.max_real_time_seconds(),
        frame_interval_ms = control.frame_interval_ms(),
        frame_seconds,
        "Simulation starting"
    );

    let (end_reason, final_summary) = loop {
        if control.is_stop_requested() {
            info!("Stop requested");
            break (SimulationEndReason::StopRequested, last_summary);
        }

        if control.time_limit_reached() {
            info!(
                max_seconds = control.max_real_time_seconds(),
                elapsed = control.elapsed_seconds(),
                "Real-time limit reached"
            );
            break (SimulationEndReason::MaxRealTimeReached, last_summary);
        }

        let summary = simulation.tick(frame_seconds)?;
        total_frames = total_frames.saturating_add(1);

        callback.on_frame(&summary, simulation);

        if simulation.is_player_dead() {
            info!(frame = summary.frame, "Player died");
            break (SimulationEndReason::PlayerDied, Some(summary));
        }

        if control.stop_on_collapse() && summary.villagers > 0 && summary.loyal == 0 {
            info!(
                frame = summary.frame,
                rebels = summary.rebels,
                "No loyal villagers left -- village collapsed"
            );
            break (SimulationEndReason::VillageCollapsed, Some(summary));
        }

        if control.frame_limit_reached(summary.frame) {
            info!(
                frame = summary.frame,
                max_frames = control.max_frames(),
                "Frame limit reached"
            );
            break (SimulationEndReason::MaxFramesReached, Some(summary));
        }

        last_summary = Some(summary);

        let interval_ms = control.frame_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
    };

    control.set_end_reason(end_reason).await;
    Ok(SimulationResult {
        end_reason,
        final_summary,
        total_frames,
    })
}

/// Log the end of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_frames = result.total_frames,
        final_frame = result.final_summary.as_ref().map(|s| s.frame),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            frame = summary.frame,
            day = summary.day,
            loyal = summary.loyal,
            rebels = summary.rebels,
            raiders = summary.raiders,
            communal_power = summary.communal_power,
            "Final frame summary"
        );
    } else {
        warn!("Simulation ended with no frames executed");
    }
}
