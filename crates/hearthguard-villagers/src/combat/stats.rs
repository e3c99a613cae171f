//! Derived combat numbers.
//!
//! Stats are recomputed eagerly whenever an input changes (tier, state,
//! efficiency, mage buffs, captain influence) and cached on the combat component.
//! Damage application only reads the cache.

use hearthguard_types::{Role, Tier, VillagerState};

use crate::config::CombatConfig;
use crate::influence::InfluenceBonus;

/// Cached combat numbers for one villager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombatStats {
    /// Damage per hit.
    pub damage: f32,
    /// Seconds between attacks, before efficiency stretching.
    pub cooldown: f32,
    /// Reach of an attack.
    pub range: f32,
    /// Radius within which targets are noticed, before efficiency scaling.
    pub detection_radius: f32,
}

/// Inputs that drive [`compute_stats`].
#[derive(Debug, Clone, Copy)]
pub struct StatInputs<'a> {
    /// Occupation.
    pub role: Role,
    /// Power tier.
    pub tier: Tier,
    /// Morale state.
    pub state: VillagerState,
    /// Hunger-driven efficiency in `(0, 1]`.
    pub efficiency: f32,
    /// Product of all active mage buffs.
    pub buff_multiplier: f32,
    /// Captain influence, if any.
    pub influence: Option<&'a InfluenceBonus>,
}

/// Derive combat stats.
///
/// ```text
/// damage   = (base + tier * per_tier) * efficiency * buffs [* rebel_damage] [* (1 + influence_boost)]
/// cooldown = max(floor, base - tier * reduction) [* rebel_cooldown] [* (1 - influence_reduction)]
/// range    = base + tier * per_tier
/// ```
pub fn compute_stats(config: &CombatConfig, inputs: StatInputs<'_>) -> CombatStats {
    let profile = config.profile(inputs.role);
    let rebel = inputs.state == VillagerState::Rebel;

    let mut damage = profile.damage.at(inputs.tier) * inputs.efficiency * inputs.buff_multiplier;
    if rebel {
        damage *= config.rebel_damage_multiplier;
    }

    let tiered_cooldown = inputs
        .tier
        .factor()
        .mul_add(-profile.cooldown_reduction_per_tier, profile.base_cooldown);
    let mut cooldown = tiered_cooldown.max(config.cooldown_floor);
    if rebel {
        cooldown *= config.rebel_cooldown_multiplier;
    }

    if let Some(bonus) = inputs.influence {
        damage *= 1.0 + bonus.damage_boost;
        cooldown *= 1.0 - bonus.cooldown_reduction;
    }

    CombatStats {
        damage: damage.max(0.0),
        cooldown,
        range: profile.range.at(inputs.tier),
        detection_radius: profile.detection_radius,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn inputs(role: Role, tier: Tier, state: VillagerState) -> StatInputs<'static> {
        StatInputs {
            role,
            tier,
            state,
            efficiency: 1.0,
            buff_multiplier: 1.0,
            influence: None,
        }
    }

    #[test]
    fn tier_scales_damage_range_and_cooldown() {
        let config = CombatConfig::default();
        let stats = compute_stats(&config, inputs(Role::Commoner, Tier::Two, VillagerState::Loyal));
        assert!(close(stats.damage, 16.0));
        assert!(close(stats.cooldown, 0.9));
        assert!(close(stats.range, 2.0));
    }

    #[test]
    fn rebels_hit_harder_and_faster() {
        let config = CombatConfig::default();
        let stats = compute_stats(&config, inputs(Role::Commoner, Tier::Zero, VillagerState::Rebel));
        assert!(close(stats.damage, 15.0));
        assert!(close(stats.cooldown, 0.96));
    }

    #[test]
    fn cooldown_floor_applies_before_rebel_multiplier() {
        let mut config = CombatConfig::default();
        config.commoner.cooldown_reduction_per_tier = 1.0;
        let loyal = compute_stats(&config, inputs(Role::Commoner, Tier::Two, VillagerState::Loyal));
        assert!(close(loyal.cooldown, 0.5));
        let rebel = compute_stats(&config, inputs(Role::Commoner, Tier::Two, VillagerState::Rebel));
        assert!(close(rebel.cooldown, 0.4));
    }

    #[test]
    fn low_efficiency_weakens_damage() {
        let config = CombatConfig::default();
        let mut hungry = inputs(Role::Commoner, Tier::Two, VillagerState::Loyal);
        hungry.efficiency = 0.5;
        let stats = compute_stats(&config, hungry);
        assert!(close(stats.damage, 8.0));
        // Cadence is stretched at attack time, not here.
        assert!(close(stats.cooldown, 0.9));
    }

    #[test]
    fn mage_buffs_multiply_damage() {
        let config = CombatConfig::default();
        let mut with_buffs = inputs(Role::Farmer, Tier::Zero, VillagerState::Loyal);
        with_buffs.buff_multiplier = 1.25 * 1.25;
        let stats = compute_stats(&config, with_buffs);
        assert!(close(stats.damage, 12.5));
    }

    #[test]
    fn influence_boosts_damage_and_cuts_cooldown() {
        let config = CombatConfig::default();
        let bonus = InfluenceBonus {
            damage_boost: 0.2,
            speed_boost: 0.15,
            damage_reduction: 0.15,
            cooldown_reduction: 0.15,
        };
        let mut influenced = inputs(Role::Commoner, Tier::Zero, VillagerState::Loyal);
        influenced.influence = Some(&bonus);
        let stats = compute_stats(&config, influenced);
        assert!(close(stats.damage, 12.0));
        assert!(close(stats.cooldown, 1.02));
    }
}
