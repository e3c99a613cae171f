//! Villager state, discontent, rebellion, combat, and captain influence for
//! the Hearthguard simulation.
//!
//! This crate is the logic layer for villagers. It never touches the
//! roster or the power economy; cross-villager rules live in
//! `hearthguard-core`, which feeds villagers their power and food and
//! applies the [`CombatEffect`]s they return.
//!
//! # Modules
//!
//! - [`animation`] -- Fire-and-forget visual triggers ([`Animator`])
//! - [`buffs`] -- Stacking time-limited mage buffs ([`MageBuffs`])
//! - [`combat`] -- Targeting, cooldown gating, stat scaling, role attacks ([`VillagerCombat`])
//! - [`config`] -- Tunable parameters ([`VillagerConfig`])
//! - [`discontent`] -- Fixed-step accrual and the morale state rule
//! - [`efficiency`] -- Combat efficiency from food and morale
//! - [`error`] -- Error types ([`VillagerError`])
//! - [`health`] -- Hit points and the [`Damageable`] contract
//! - [`influence`] -- Captain auras and honor guards ([`CaptainInfluenceSystem`])
//! - [`movement`] -- The "move toward" collaborator ([`Movement`])
//! - [`rebellion`] -- The rebellion telegraph ([`RebellionSequence`])
//! - [`spatial`] -- Radius queries over a frame snapshot ([`SpatialQuery`])
//! - [`stats`] -- Power, food, discontent and tier ([`VillagerStats`])
//! - [`villager`] -- The [`Villager`] facade and its builder
//!
//! # Usage
//!
//! ```
//! use hearthguard_types::{HolderId, Role, VillagerState};
//! use hearthguard_villagers::{SpatialIndex, Villager};
//!
//! let mut villager = Villager::builder("Wren", Role::Commoner)
//!     .holder(HolderId::new())
//!     .build()
//!     .ok();
//! if let Some(v) = villager.as_mut() {
//!     v.add_discontent(1000.0);
//!     assert!(v.is_rebellion_pending());
//!     v.tick(1.0, &SpatialIndex::new());
//!     assert_eq!(v.state(), VillagerState::Rebel);
//! }
//! ```

pub mod animation;
pub mod buffs;
pub mod combat;
pub mod config;
pub mod discontent;
pub mod efficiency;
pub mod error;
pub mod health;
pub mod influence;
pub mod movement;
pub mod rebellion;
pub mod spatial;
pub mod stats;
pub mod villager;

// Re-export primary types at crate root for convenience.
pub use animation::{Animator, NullAnimator, TracingAnimator};
pub use buffs::MageBuffs;
pub use combat::{
    AttackExecution, CombatEffect, CombatFrame, CombatOutcome, CombatStats, VillagerCombat,
    dealer_for_role,
};
pub use config::{
    AttackTiming, CombatConfig, DiscontentConfig, EfficiencyConfig, HealthConfig, InfluenceConfig,
    MageBuffConfig, RoleCombatProfile, TierScaled, VillagerConfig,
};
pub use discontent::StateDecision;
pub use efficiency::combat_efficiency;
pub use error::VillagerError;
pub use health::{Damageable, Health};
pub use influence::{CaptainInfluenceSystem, InfluenceBonus, bonus_for_tier};
pub use movement::{Destination, Movement, StraightLineMover};
pub use rebellion::{RebellionPhase, RebellionSequence};
pub use spatial::{Candidate, SpatialIndex, SpatialQuery};
pub use stats::{MAX_DISCONTENT, MAX_FOOD, VillagerStats, tier_for_power};
pub use villager::{Villager, VillagerBuilder, VillagerTick};
