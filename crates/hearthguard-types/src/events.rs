//! Notification vocabulary published on the simulation event bus.
//!
//! Every cross-component notification the simulation emits is one of the
//! [`SimEvent`] variants. Events are delivered in publication order, and
//! cascade-rebellion events are published inside the frame that caused
//! them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Role, VillagerState};
use crate::ids::{DropId, EntityId};

/// A notification published by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SimEvent {
    /// The clock crossed into night.
    NightBegan {
        /// Day number (1-indexed).
        day: u32,
    },

    /// The clock crossed into a new day.
    DayBegan {
        /// Day number (1-indexed).
        day: u32,
    },

    /// A villager's morale state changed.
    VillagerStateChanged {
        /// The villager.
        villager: EntityId,
        /// Previous state.
        from: VillagerState,
        /// New state.
        to: VillagerState,
    },

    /// A villager hit maximum discontent and began the rebellion telegraph.
    RebellionStarted {
        /// The villager.
        villager: EntityId,
    },

    /// A villager committed to rebellion.
    VillagerRebelled {
        /// The villager.
        villager: EntityId,
        /// The villager's role.
        role: Role,
    },

    /// A captain's rebellion pushed disgruntled commoners over the edge.
    CaptainCascade {
        /// The captain who rebelled.
        captain: EntityId,
        /// Commoners forced to maximum discontent.
        forced: Vec<EntityId>,
    },

    /// The rebel count crossed the mass-rebellion threshold.
    MassRebellion {
        /// The villager whose rebellion triggered the evaluation.
        trigger: EntityId,
        /// Committed rebels at evaluation time.
        rebel_count: u32,
        /// Roster size at evaluation time.
        roster_size: u32,
        /// Villagers forced to maximum discontent.
        forced: Vec<EntityId>,
    },

    /// A villager changed combat target.
    TargetAcquired {
        /// The villager.
        villager: EntityId,
        /// The new target, or `None` when the target was dropped.
        target: Option<EntityId>,
    },

    /// A loyal villager was struck by its own side.
    FriendlyFire {
        /// The villager that was hit.
        victim: EntityId,
        /// Who struck it.
        attacker: EntityId,
    },

    /// A villager died.
    VillagerDied {
        /// The villager.
        villager: EntityId,
        /// The villager's role.
        role: Role,
        /// The entity that dealt the killing blow, if known.
        killer: Option<EntityId>,
        /// Power the villager was holding when it died.
        dropped_power: u32,
    },

    /// A villager saw the player kill one of its own.
    WitnessedPlayerKill {
        /// The witness.
        witness: EntityId,
        /// The villager that was killed.
        victim: EntityId,
    },

    /// Nightly food distribution ran.
    FoodDistributed {
        /// Total food produced by farmers.
        production: f32,
        /// Food given to each living villager.
        share: f32,
        /// Number of villagers fed.
        recipients: u32,
    },

    /// A death freed up food that was split among the survivors.
    FoodRedistributed {
        /// Extra food given to each survivor.
        share: f32,
        /// Number of villagers that received the extra share.
        recipients: u32,
    },

    /// A building was destroyed.
    BuildingDestroyed {
        /// The building.
        building: EntityId,
        /// Residents that lost their support.
        displaced: Vec<EntityId>,
    },

    /// A commoner entered a captain's aura.
    InfluenceApplied {
        /// The captain.
        captain: EntityId,
        /// The commoner.
        commoner: EntityId,
    },

    /// A commoner left a captain's aura.
    InfluenceRemoved {
        /// The captain.
        captain: EntityId,
        /// The commoner.
        commoner: EntityId,
    },

    /// A commoner joined a captain's honor guard.
    FollowerPromoted {
        /// The captain.
        captain: EntityId,
        /// The new follower.
        follower: EntityId,
    },

    /// A commoner was released from a captain's honor guard.
    FollowerEvicted {
        /// The captain.
        captain: EntityId,
        /// The released follower.
        follower: EntityId,
    },

    /// A dying villager released its power onto the ground.
    PowerDropped {
        /// The drop.
        drop: DropId,
        /// The villager that died.
        villager: EntityId,
        /// Amount of power dropped.
        amount: u32,
    },

    /// The player picked up dropped power.
    PowerCollected {
        /// The drop.
        drop: DropId,
        /// Amount collected.
        amount: u32,
    },

    /// A raider entered the map.
    RaiderSpawned {
        /// The raider.
        raider: EntityId,
    },

    /// A raider was killed.
    RaiderDied {
        /// The raider.
        raider: EntityId,
        /// Who killed it, if known.
        killer: Option<EntityId>,
    },

    /// The player was killed.
    PlayerDied,
}

impl SimEvent {
    /// Short machine-readable name of the event kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NightBegan { .. } => "night_began",
            Self::DayBegan { .. } => "day_began",
            Self::VillagerStateChanged { .. } => "villager_state_changed",
            Self::RebellionStarted { .. } => "rebellion_started",
            Self::VillagerRebelled { .. } => "villager_rebelled",
            Self::CaptainCascade { .. } => "captain_cascade",
            Self::MassRebellion { .. } => "mass_rebellion",
            Self::TargetAcquired { .. } => "target_acquired",
            Self::FriendlyFire { .. } => "friendly_fire",
            Self::VillagerDied { .. } => "villager_died",
            Self::WitnessedPlayerKill { .. } => "witnessed_player_kill",
            Self::FoodDistributed { .. } => "food_distributed",
            Self::FoodRedistributed { .. } => "food_redistributed",
            Self::BuildingDestroyed { .. } => "building_destroyed",
            Self::InfluenceApplied { .. } => "influence_applied",
            Self::InfluenceRemoved { .. } => "influence_removed",
            Self::FollowerPromoted { .. } => "follower_promoted",
            Self::FollowerEvicted { .. } => "follower_evicted",
            Self::PowerDropped { .. } => "power_dropped",
            Self::PowerCollected { .. } => "power_collected",
            Self::RaiderSpawned { .. } => "raider_spawned",
            Self::RaiderDied { .. } => "raider_died",
            Self::PlayerDied => "player_died",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_tag_matches_kind() {
        let event = SimEvent::MassRebellion {
            trigger: EntityId::new(),
            rebel_count: 3,
            roster_size: 10,
            forced: vec![EntityId::new()],
        };
        let json = serde_json::to_value(&event).ok();
        let tag = json
            .as_ref()
            .and_then(|v| v.get("kind"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);
        assert_eq!(tag.as_deref(), Some(event.kind()));
    }

    #[test]
    fn unit_variant_roundtrip() {
        let json = serde_json::to_string(&SimEvent::PlayerDied).unwrap_or_default();
        let back: Option<SimEvent> = serde_json::from_str(&json).ok();
        assert_eq!(back, Some(SimEvent::PlayerDied));
    }
}
