//! Enumeration types for the Hearthguard simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A villager's occupation. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Leads nearby commoners and projects an influence aura.
    Captain,
    /// Produces food for the whole village.
    Farmer,
    /// Ranged caster that buffs and heals allies.
    Mage,
    /// Maintains structures. Carries no weapon.
    Builder,
    /// Rank-and-file fighter.
    Commoner,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Captain,
        Self::Farmer,
        Self::Mage,
        Self::Builder,
        Self::Commoner,
    ];
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Captain => write!(f, "captain"),
            Self::Farmer => write!(f, "farmer"),
            Self::Mage => write!(f, "mage"),
            Self::Builder => write!(f, "builder"),
            Self::Commoner => write!(f, "commoner"),
        }
    }
}

// ---------------------------------------------------------------------------
// Morale state
// ---------------------------------------------------------------------------

/// A villager's allegiance, ordered by severity.
///
/// Transitions are driven by discontent thresholds, not by ordinal
/// stepping. `Rebel` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum VillagerState {
    /// Content and fighting for the village.
    Loyal,
    /// Disgruntled: fights less effectively and reacts more slowly.
    Angry,
    /// Turned against the village. Never leaves this state.
    Rebel,
}

impl VillagerState {
    /// Whether this state is terminal.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rebel)
    }
}

impl core::fmt::Display for VillagerState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Loyal => write!(f, "loyal"),
            Self::Angry => write!(f, "angry"),
            Self::Rebel => write!(f, "rebel"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Discrete power-investment level derived from allocated power.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum Tier {
    /// Fewer than 2 power.
    #[default]
    Zero,
    /// 2 or 3 power.
    One,
    /// 4 or more power.
    Two,
}

impl Tier {
    /// Power needed to reach tier 1.
    pub const TIER_ONE_POWER: u32 = 2;
    /// Power needed to reach tier 2.
    pub const TIER_TWO_POWER: u32 = 4;

    /// Derive the tier for an allocated power amount.
    pub const fn from_power(power: u32) -> Self {
        if power >= Self::TIER_TWO_POWER {
            Self::Two
        } else if power >= Self::TIER_ONE_POWER {
            Self::One
        } else {
            Self::Zero
        }
    }

    /// The tier as an integer level (0, 1, or 2).
    pub const fn level(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// The tier level as a float, for scaling formulas.
    pub fn factor(self) -> f32 {
        f32::from(self.level())
    }
}

// ---------------------------------------------------------------------------
// Factions and spatial categories
// ---------------------------------------------------------------------------

/// The side an entity fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Faction {
    /// The player and loyal villagers.
    Village,
    /// Villagers who have rebelled.
    Rebels,
    /// Raiders from outside.
    Raiders,
}

/// Coarse category used to filter spatial queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EntityCategory {
    /// The player character.
    Player,
    /// A villager who is Loyal or Angry.
    LoyalVillager,
    /// A villager who has committed to rebellion.
    RebelVillager,
    /// A hostile-tagged entity (raider).
    Hostile,
    /// A village building.
    Building,
}

impl EntityCategory {
    /// Categories a loyal villager will attack.
    pub const LOYAL_TARGETS: [Self; 2] = [Self::Hostile, Self::RebelVillager];

    /// Categories a rebel villager will attack.
    pub const REBEL_TARGETS: [Self; 2] = [Self::Player, Self::LoyalVillager];

    /// The spatial category for a villager in the given state.
    pub const fn for_villager(state: VillagerState) -> Self {
        match state {
            VillagerState::Loyal | VillagerState::Angry => Self::LoyalVillager,
            VillagerState::Rebel => Self::RebelVillager,
        }
    }
}

/// Tint used for fire-and-forget flash effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum FlashColor {
    /// Neutral tint (Loyal).
    White,
    /// Warning tint (Angry, rebellion telegraph).
    Orange,
    /// Hostile tint (Rebel).
    Red,
    /// Damage taken.
    Crimson,
    /// Buff or heal received.
    Gold,
}

impl FlashColor {
    /// Resting tint for a morale state.
    pub const fn for_state(state: VillagerState) -> Self {
        match state {
            VillagerState::Loyal => Self::White,
            VillagerState::Angry => Self::Orange,
            VillagerState::Rebel => Self::Red,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds_match_power() {
        for power in 0..20_u32 {
            let expected = if power >= 4 {
                2
            } else if power >= 2 {
                1
            } else {
                0
            };
            assert_eq!(Tier::from_power(power).level(), expected, "power {power}");
        }
    }

    #[test]
    fn state_severity_ordering() {
        assert!(VillagerState::Loyal < VillagerState::Angry);
        assert!(VillagerState::Angry < VillagerState::Rebel);
        assert!(VillagerState::Rebel.is_terminal());
        assert!(!VillagerState::Angry.is_terminal());
    }

    #[test]
    fn villager_category_follows_state() {
        assert_eq!(
            EntityCategory::for_villager(VillagerState::Angry),
            EntityCategory::LoyalVillager
        );
        assert_eq!(
            EntityCategory::for_villager(VillagerState::Rebel),
            EntityCategory::RebelVillager
        );
    }
}
