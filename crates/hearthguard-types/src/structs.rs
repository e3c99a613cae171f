//! Read-only snapshots consumed by the UI surface.
//!
//! Snapshots are plain data copied out of the simulation. Nothing in the
//! UI holds a reference back into live state, so a snapshot can never be
//! used to mutate the simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Faction, Role, Tier, VillagerState};
use crate::ids::{EntityId, HolderId};

/// Point-in-time view of one villager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VillagerSnapshot {
    /// Villager identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Occupation.
    pub role: Role,
    /// Morale state.
    pub state: VillagerState,
    /// Current side.
    pub faction: Faction,
    /// Power allocated this cycle.
    pub power: u32,
    /// Tier derived from power.
    pub tier: Tier,
    /// Food level in `[0, 1]`.
    pub food: f32,
    /// Discontent in `[0, 100]`.
    pub discontent: f32,
    /// Whether the villager's supporting structure still stands.
    pub is_active: bool,
    /// Current hit points.
    pub health: f32,
    /// Maximum hit points.
    pub max_health: f32,
    /// Combat efficiency in `(0, 1]`.
    pub efficiency: f32,
    /// Whether the rebellion telegraph is running.
    pub rebellion_pending: bool,
    /// World position.
    pub position: (f32, f32),
}

/// Point-in-time view of one power pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PowerHolderSnapshot {
    /// Holder identifier.
    pub id: HolderId,
    /// Display name.
    pub name: String,
    /// Power currently held.
    pub current: u32,
    /// Capacity.
    pub max: u32,
    /// Whether this is the player's pool.
    pub is_player: bool,
}

/// Point-in-time view of the power economy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EconomySnapshot {
    /// Shared communal pool.
    pub communal_power: u32,
    /// Power lying on the ground in uncollected drops.
    pub dropped_power: u32,
    /// Player share of all power in circulation, in `[0, 1]`.
    pub greed: f32,
    /// Every registered holder.
    pub holders: Vec<PowerHolderSnapshot>,
}

/// Point-in-time view of the whole village.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VillageSnapshot {
    /// Frames simulated so far.
    pub frame: u64,
    /// Simulated seconds elapsed.
    pub elapsed_seconds: f64,
    /// Current day number (1-indexed).
    pub day: u32,
    /// Whether it is currently night.
    pub is_night: bool,
    /// Living villagers.
    pub villagers: Vec<VillagerSnapshot>,
    /// Power economy.
    pub economy: EconomySnapshot,
    /// Player hit points.
    pub player_health: f32,
    /// Raiders currently on the map.
    pub raiders_alive: u32,
}

impl VillageSnapshot {
    /// Number of villagers in the given state.
    pub fn count_in_state(&self, state: VillagerState) -> usize {
        self.villagers.iter().filter(|v| v.state == state).count()
    }
}
