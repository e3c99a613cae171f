//! Tunable parameters for villager mechanics.
//!
//! Each struct mirrors one section of `hearthguard-config.yaml`. Every
//! field has a default, so a section may be omitted or only partly
//! specified. [`VillagerConfig`] bundles the sections a villager needs and
//! is shared by every villager through an `Arc`.

use hearthguard_types::{Role, Tier};
use serde::Deserialize;

use crate::error::VillagerError;

/// A value that grows linearly with tier: `base + tier * per_tier`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TierScaled {
    /// Value at tier 0.
    pub base: f32,
    /// Added per tier level.
    pub per_tier: f32,
}

impl TierScaled {
    /// Construct a tier-scaled value.
    pub const fn new(base: f32, per_tier: f32) -> Self {
        Self { base, per_tier }
    }

    /// Evaluate at the given tier.
    pub fn at(self, tier: Tier) -> f32 {
        self.per_tier.mul_add(tier.factor(), self.base)
    }
}

// ---------------------------------------------------------------------------
// Discontent
// ---------------------------------------------------------------------------

/// Discontent accrual, food decay, and rebellion timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiscontentConfig {
    /// Passive discontent per second at tier 0 (default: 1.0).
    pub base_discontent_rate: f32,
    /// Passive discontent per second removed per tier (default: 0.4).
    pub power_discontent_reduction_per_tier: f32,
    /// Food level below which discontent accrues faster (default: 0.3).
    pub low_food_threshold: f32,
    /// Discontent rate multiplier while food is low (default: 2.0).
    pub low_food_discontent_multiplier: f32,
    /// Food decay in percent per second at tier 0 (default: 1.0).
    pub base_food_decay: f32,
    /// Food decay in percent per second removed per tier (default: 0.25).
    pub food_decay_reduction_per_tier: f32,
    /// Discontent at which a villager turns Angry (default: 50).
    pub angry_threshold: f32,
    /// Discontent at which the rebellion sequence starts (default: 100).
    pub rebel_threshold: f32,
    /// Fixed accrual step in seconds (default: 0.1).
    pub step_seconds: f32,
    /// Length of the Angry warning before a rebel commits (default: 1.0).
    pub telegraph_seconds: f32,
    /// Health multiplier applied on commit (default: 1.5).
    pub rebel_health_multiplier: f32,
    /// Discontent added when hit by an ally (default: 15).
    pub friendly_fire_discontent: f32,
    /// Discontent added when the villager's building falls (default: 20).
    pub building_destroyed_discontent: f32,
    /// Radius within which a player kill is witnessed (default: 6.0).
    pub witness_radius: f32,
    /// Discontent removed by nightly recovery (default: 10).
    pub nightly_recovery: f32,
    /// Discontent per night at full rebellion risk (default: 10).
    pub greed_discontent_per_night: f32,
}

impl Default for DiscontentConfig {
    fn default() -> Self {
        Self {
            base_discontent_rate: 1.0,
            power_discontent_reduction_per_tier: 0.4,
            low_food_threshold: 0.3,
            low_food_discontent_multiplier: 2.0,
            base_food_decay: 1.0,
            food_decay_reduction_per_tier: 0.25,
            angry_threshold: 50.0,
            rebel_threshold: 100.0,
            step_seconds: 0.1,
            telegraph_seconds: 1.0,
            rebel_health_multiplier: 1.5,
            friendly_fire_discontent: 15.0,
            building_destroyed_discontent: 20.0,
            witness_radius: 6.0,
            nightly_recovery: 10.0,
            greed_discontent_per_night: 10.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Efficiency
// ---------------------------------------------------------------------------

/// Combat efficiency curve.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EfficiencyConfig {
    /// Food level at and above which food no longer limits efficiency.
    pub food_threshold: f32,
    /// Efficiency at zero food.
    pub low_food_floor: f32,
    /// Multiplier applied while Angry.
    pub angry_multiplier: f32,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            food_threshold: 0.5,
            low_food_floor: 0.4,
            angry_multiplier: 0.7,
        }
    }
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// Base combat numbers for one role.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoleCombatProfile {
    /// Damage per hit.
    pub damage: TierScaled,
    /// Seconds between attacks at tier 0.
    pub base_cooldown: f32,
    /// Cooldown seconds removed per tier.
    pub cooldown_reduction_per_tier: f32,
    /// Reach of an attack.
    pub range: TierScaled,
    /// Radius within which targets are noticed, before efficiency scaling.
    pub detection_radius: f32,
}

impl RoleCombatProfile {
    const fn new(
        damage: TierScaled,
        base_cooldown: f32,
        cooldown_reduction_per_tier: f32,
        range: TierScaled,
        detection_radius: f32,
    ) -> Self {
        Self {
            damage,
            base_cooldown,
            cooldown_reduction_per_tier,
            range,
            detection_radius,
        }
    }
}

/// Phase lengths of one attack, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AttackTiming {
    /// Wind-up before the damage window opens.
    pub windup: f32,
    /// Length of the damage window.
    pub active: f32,
    /// Follow-through after the window closes.
    pub recovery: f32,
}

impl Default for AttackTiming {
    fn default() -> Self {
        Self {
            windup: 0.2,
            active: 0.15,
            recovery: 0.25,
        }
    }
}

/// Combat tuning for every role.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Commoner profile.
    pub commoner: RoleCombatProfile,
    /// Captain profile.
    pub captain: RoleCombatProfile,
    /// Farmer profile.
    pub farmer: RoleCombatProfile,
    /// Mage profile.
    pub mage: RoleCombatProfile,
    /// Builder profile. Builders carry no weapon, so only detection and
    /// range are used.
    pub builder: RoleCombatProfile,
    /// Damage multiplier once Rebel (default: 1.5).
    pub rebel_damage_multiplier: f32,
    /// Cooldown multiplier once Rebel (default: 0.8).
    pub rebel_cooldown_multiplier: f32,
    /// Lowest cooldown tier scaling can reach (default: 0.5).
    pub cooldown_floor: f32,
    /// Frames between target searches (default: 30).
    pub retarget_frames: u32,
    /// Frames between target searches while Angry (default: 60).
    pub angry_retarget_frames: u32,
    /// Maximum targets a captain's cleave can hit (default: 3).
    pub cleave_max_targets: usize,
    /// Phase lengths of an attack.
    pub timing: AttackTiming,
    /// Walking speed in units per second (default: 2.5).
    pub move_speed: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            commoner: RoleCombatProfile::new(
                TierScaled::new(10.0, 3.0),
                1.2,
                0.15,
                TierScaled::new(1.5, 0.25),
                8.0,
            ),
            captain: RoleCombatProfile::new(
                TierScaled::new(14.0, 4.0),
                1.4,
                0.2,
                TierScaled::new(1.8, 0.3),
                10.0,
            ),
            farmer: RoleCombatProfile::new(
                TierScaled::new(8.0, 2.0),
                1.5,
                0.1,
                TierScaled::new(1.6, 0.2),
                6.0,
            ),
            mage: RoleCombatProfile::new(
                TierScaled::new(6.0, 2.0),
                2.0,
                0.2,
                TierScaled::new(6.0, 0.5),
                10.0,
            ),
            builder: RoleCombatProfile::new(
                TierScaled::new(0.0, 0.0),
                1.5,
                0.0,
                TierScaled::new(1.2, 0.0),
                6.0,
            ),
            rebel_damage_multiplier: 1.5,
            rebel_cooldown_multiplier: 0.8,
            cooldown_floor: 0.5,
            retarget_frames: 30,
            angry_retarget_frames: 60,
            cleave_max_targets: 3,
            timing: AttackTiming::default(),
            move_speed: 2.5,
        }
    }
}

impl CombatConfig {
    /// The combat profile for a role.
    pub const fn profile(&self, role: Role) -> &RoleCombatProfile {
        match role {
            Role::Commoner => &self.commoner,
            Role::Captain => &self.captain,
            Role::Farmer => &self.farmer,
            Role::Mage => &self.mage,
            Role::Builder => &self.builder,
        }
    }
}

// ---------------------------------------------------------------------------
// Mage buffs
// ---------------------------------------------------------------------------

/// Support effects cast by mages on allies.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MageBuffConfig {
    /// Damage multiplier granted per buff (default: 1.25).
    pub factor: f32,
    /// Seconds a buff lasts (default: 5).
    pub duration_seconds: f32,
    /// Radius around the mage in which allies are buffed (default: 5).
    pub radius: f32,
    /// Hit points restored to each ally per cast (default: 5).
    pub heal: f32,
}

impl Default for MageBuffConfig {
    fn default() -> Self {
        Self {
            factor: 1.25,
            duration_seconds: 5.0,
            radius: 5.0,
            heal: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Captain influence
// ---------------------------------------------------------------------------

/// Captain aura and honor guard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InfluenceConfig {
    /// Aura radius.
    pub radius: TierScaled,
    /// Fractional damage boost.
    pub damage_boost: TierScaled,
    /// Fractional movement speed boost.
    pub speed_boost: TierScaled,
    /// Fractional incoming damage reduction.
    pub damage_reduction: TierScaled,
    /// Fractional cooldown reduction.
    pub cooldown_reduction: TierScaled,
    /// Honor-guard size at tier 0 (default: 0).
    pub base_followers: u32,
    /// Honor-guard places added per tier (default: 1).
    pub followers_per_tier: u32,
    /// Radius of the ring followers stand on.
    pub follower_ring_radius: f32,
    /// Seconds between influence passes (default: 0.2, i.e. 5 Hz).
    pub tick_interval_seconds: f32,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            radius: TierScaled::new(5.0, 1.5),
            damage_boost: TierScaled::new(0.10, 0.05),
            speed_boost: TierScaled::new(0.05, 0.05),
            damage_reduction: TierScaled::new(0.05, 0.05),
            cooldown_reduction: TierScaled::new(0.05, 0.05),
            base_followers: 0,
            followers_per_tier: 1,
            follower_ring_radius: 1.5,
            tick_interval_seconds: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Villager hit points.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Maximum hit points by tier.
    pub max_health: TierScaled,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: TierScaled::new(100.0, 20.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Everything a villager needs to tick.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VillagerConfig {
    /// Discontent and rebellion.
    pub discontent: DiscontentConfig,
    /// Efficiency curve.
    pub efficiency: EfficiencyConfig,
    /// Combat numbers.
    pub combat: CombatConfig,
    /// Mage support.
    pub mage_buff: MageBuffConfig,
    /// Captain influence.
    pub influence: InfluenceConfig,
    /// Hit points.
    pub health: HealthConfig,
}

const fn positive(value: f32, field: &'static str) -> Result<(), VillagerError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(VillagerError::InvalidConfig {
            field,
            reason: "must be greater than zero",
        })
    }
}

const fn non_negative(value: f32, field: &'static str) -> Result<(), VillagerError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(VillagerError::InvalidConfig {
            field,
            reason: "must not be negative",
        })
    }
}

fn unit_interval(value: f32, field: &'static str) -> Result<(), VillagerError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(VillagerError::InvalidConfig {
            field,
            reason: "must be within [0, 1]",
        })
    }
}

impl VillagerConfig {
    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`VillagerError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), VillagerError> {
        let d = &self.discontent;
        positive(d.step_seconds, "discontent.step_seconds")?;
        non_negative(d.base_discontent_rate, "discontent.base_discontent_rate")?;
        non_negative(d.base_food_decay, "discontent.base_food_decay")?;
        non_negative(d.telegraph_seconds, "discontent.telegraph_seconds")?;
        positive(d.rebel_health_multiplier, "discontent.rebel_health_multiplier")?;
        non_negative(d.witness_radius, "discontent.witness_radius")?;
        unit_interval(d.low_food_threshold, "discontent.low_food_threshold")?;
        if !(0.0 < d.angry_threshold && d.angry_threshold < d.rebel_threshold) {
            return Err(VillagerError::InvalidConfig {
                field: "discontent.angry_threshold",
                reason: "must be positive and below rebel_threshold",
            });
        }
        if d.rebel_threshold > crate::stats::MAX_DISCONTENT {
            return Err(VillagerError::InvalidConfig {
                field: "discontent.rebel_threshold",
                reason: "must not exceed 100",
            });
        }

        let e = &self.efficiency;
        positive(e.food_threshold, "efficiency.food_threshold")?;
        unit_interval(e.food_threshold, "efficiency.food_threshold")?;
        unit_interval(e.low_food_floor, "efficiency.low_food_floor")?;
        unit_interval(e.angry_multiplier, "efficiency.angry_multiplier")?;
        positive(e.angry_multiplier, "efficiency.angry_multiplier")?;

        let c = &self.combat;
        positive(c.cooldown_floor, "combat.cooldown_floor")?;
        positive(c.rebel_cooldown_multiplier, "combat.rebel_cooldown_multiplier")?;
        non_negative(c.move_speed, "combat.move_speed")?;
        if c.retarget_frames == 0 || c.angry_retarget_frames == 0 {
            return Err(VillagerError::InvalidConfig {
                field: "combat.retarget_frames",
                reason: "must be at least one frame",
            });
        }
        for role in Role::ALL {
            let profile = c.profile(role);
            positive(profile.base_cooldown, "combat.<role>.base_cooldown")?;
            non_negative(profile.detection_radius, "combat.<role>.detection_radius")?;
        }

        positive(self.mage_buff.factor, "mage_buff.factor")?;
        non_negative(self.mage_buff.duration_seconds, "mage_buff.duration_seconds")?;

        let i = &self.influence;
        positive(i.tick_interval_seconds, "influence.tick_interval_seconds")?;
        non_negative(i.radius.base, "influence.radius.base")?;
        for (value, field) in [
            (i.damage_reduction.at(Tier::Two), "influence.damage_reduction"),
            (i.cooldown_reduction.at(Tier::Two), "influence.cooldown_reduction"),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(VillagerError::InvalidConfig {
                    field,
                    reason: "must stay within [0, 1) at every tier",
                });
            }
        }

        positive(self.health.max_health.base, "health.max_health.base")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(VillagerConfig::default().validate().is_ok());
    }

    #[test]
    fn tier_scaling() {
        let radius = InfluenceConfig::default().radius;
        assert!((radius.at(Tier::Zero) - 5.0).abs() < 1e-6);
        assert!((radius.at(Tier::Two) - 8.0).abs() < 1e-6);
    }

    #[test]
    fn builder_profile_deals_no_damage() {
        let combat = CombatConfig::default();
        assert!(combat.profile(Role::Builder).damage.at(Tier::Two).abs() < f32::EPSILON);
        assert!((combat.profile(Role::Mage).range.at(Tier::Zero) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn thresholds_out_of_order_rejected() {
        let mut config = VillagerConfig::default();
        config.discontent.angry_threshold = 120.0;
        assert!(matches!(
            config.validate(),
            Err(VillagerError::InvalidConfig {
                field: "discontent.angry_threshold",
                ..
            })
        ));
    }

    #[test]
    fn zero_step_rejected() {
        let mut config = VillagerConfig::default();
        config.discontent.step_seconds = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Option<VillagerConfig> =
            serde_json::from_str(r#"{"discontent": {"base_discontent_rate": 2.0}}"#).ok();
        let config = config.unwrap_or_default();
        assert!((config.discontent.base_discontent_rate - 2.0).abs() < f32::EPSILON);
        assert!((config.discontent.angry_threshold - 50.0).abs() < f32::EPSILON);
        assert_eq!(config.combat.retarget_frames, 30);
    }
}
