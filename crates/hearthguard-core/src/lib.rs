//! Simulation clock, village rules, frame tick and runner for the
//! Hearthguard simulation.
//!
//! This crate owns the [`Simulation`] context: the power economy, the
//! village roster, the world and the event bus, advanced together by
//! [`Simulation::tick`].
//!
//! # Modules
//!
//! - [`bus`] -- Ordered event delivery, frame log and broadcast stream.
//! - [`clock`] -- Frame counter and the day/night cycle.
//! - [`config`] -- Configuration loading from `hearthguard-config.yaml`
//!   into strongly-typed structs.
//! - [`control`] -- Stop requests, run bounds and pacing shared with the host.
//! - [`manager`] -- [`VillageManager`]: roster, cascade rebellions, food.
//! - [`runner`] -- The bounded async frame loop.
//! - [`tick`] -- The per-frame phases and the power shortcuts.
//! - [`world`] -- The player, raiders, buildings and drop sites.

pub mod bus;
pub mod clock;
pub mod config;
pub mod control;
pub mod manager;
pub mod runner;
pub mod tick;
pub mod world;

pub use bus::{EventBus, EventListener, RecordedEvent, TracingListener};
pub use clock::{ClockError, SimulationClock};
pub use config::{ConfigError, SimulationConfig};
pub use control::{RunControl, SimulationEndReason};
pub use manager::VillageManager;
pub use runner::{
    NoOpCallback, RunnerError, SimulationResult, TickCallback, log_simulation_end, run_simulation,
};
pub use tick::{FrameSummary, PowerCommand, Recruit, Simulation, TickError};
pub use world::{Building, Player, Raider, World};
