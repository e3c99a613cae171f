//! Discontent accrual and the morale state rule.
//!
//! Accrual runs on a fixed step (`step_seconds`, 0.1 s by default) so the
//! outcome does not depend on frame rate. Each step:
//!
//! - Food decays by `max(0, base_food_decay * step - tier * reduction * step) / 100`,
//!   floored at 0.
//! - Discontent grows by `base_rate * step - tier * reduction * step`,
//!   doubled (by default) while food is low. A non-positive rate is
//!   skipped: power can suppress passive growth but never heal.
//!
//! The state rule maps discontent onto Loyal, Angry, or the start of the
//! rebellion sequence. It is never consulted for a villager that is
//! already Rebel or already counting down to rebellion.

use hearthguard_types::{Tier, VillagerState};

use crate::config::DiscontentConfig;
use crate::stats::VillagerStats;

/// Food lost per accrual step at the given tier.
pub fn food_decay_per_step(config: &DiscontentConfig, tier: Tier) -> f32 {
    let per_second = tier
        .factor()
        .mul_add(-config.food_decay_reduction_per_tier, config.base_food_decay);
    (per_second * config.step_seconds).max(0.0) / 100.0
}

/// Discontent gained per accrual step. May be zero or negative, in which
/// case the step leaves discontent untouched.
pub fn discontent_rate_per_step(config: &DiscontentConfig, tier: Tier, food: f32) -> f32 {
    let per_second = tier
        .factor()
        .mul_add(-config.power_discontent_reduction_per_tier, config.base_discontent_rate);
    let rate = per_second * config.step_seconds;
    if food < config.low_food_threshold {
        rate * config.low_food_discontent_multiplier
    } else {
        rate
    }
}

/// What happened during one accrual step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Food removed.
    pub food_lost: f32,
    /// Discontent added.
    pub discontent_gained: f32,
}

/// Apply one accrual step to `stats`.
///
/// Food decays first; the discontent rate then sees the decayed food.
pub fn apply_step(stats: &mut VillagerStats, config: &DiscontentConfig) -> StepResult {
    let decay = food_decay_per_step(config, stats.tier());
    let food_lost = -stats.add_food(-decay);

    let rate = discontent_rate_per_step(config, stats.tier(), stats.food());
    let discontent_gained = if rate > 0.0 {
        stats.add_discontent(rate)
    } else {
        0.0
    };

    StepResult {
        food_lost,
        discontent_gained,
    }
}

/// Outcome of the state rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateDecision {
    /// Stay in the current state.
    Unchanged,
    /// Move to a non-terminal state.
    Become(VillagerState),
    /// Start the rebellion telegraph.
    BeginRebellion,
}

/// Map a discontent value onto a state transition.
///
/// Returns [`StateDecision::Unchanged`] when the villager is already Rebel
/// or already counting down (`rebellion_pending`).
pub fn evaluate_state(
    discontent: f32,
    current: VillagerState,
    rebellion_pending: bool,
    config: &DiscontentConfig,
) -> StateDecision {
    if current.is_terminal() || rebellion_pending {
        return StateDecision::Unchanged;
    }
    if discontent >= config.rebel_threshold {
        return StateDecision::BeginRebellion;
    }
    let target = if discontent >= config.angry_threshold {
        VillagerState::Angry
    } else {
        VillagerState::Loyal
    };
    if target == current {
        StateDecision::Unchanged
    } else {
        StateDecision::Become(target)
    }
}

/// Nightly recovery: a fed villager using all its power calms down.
///
/// Applies when `food >= 1` and `power >= tier * 2`. Returns the discontent
/// removed, or `None` when the conditions are not met.
pub fn apply_nightly_recovery(stats: &mut VillagerStats, config: &DiscontentConfig) -> Option<f32> {
    let required_power = u32::from(stats.tier().level()).saturating_mul(2);
    if stats.food() < crate::stats::MAX_FOOD || stats.power() < required_power {
        return None;
    }
    Some(-stats.add_discontent(-config.nightly_recovery))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn tier_reduces_food_decay() {
        let config = DiscontentConfig::default();
        // 1.0 * 0.1 / 100
        assert!(close(food_decay_per_step(&config, Tier::Zero), 0.001));
        // (0.1 - 2 * 0.025) / 100
        assert!(close(food_decay_per_step(&config, Tier::Two), 0.0005));
    }

    #[test]
    fn food_decay_never_negative() {
        let config = DiscontentConfig {
            food_decay_reduction_per_tier: 5.0,
            ..DiscontentConfig::default()
        };
        assert!(food_decay_per_step(&config, Tier::Two).abs() < f32::EPSILON);
    }

    #[test]
    fn low_food_doubles_rate() {
        let config = DiscontentConfig::default();
        let fed = discontent_rate_per_step(&config, Tier::Zero, 1.0);
        let hungry = discontent_rate_per_step(&config, Tier::Zero, 0.1);
        assert!(close(fed, 0.1));
        assert!(close(hungry, 0.2));
    }

    #[test]
    fn suppressed_rate_never_heals() {
        let config = DiscontentConfig {
            power_discontent_reduction_per_tier: 2.0,
            ..DiscontentConfig::default()
        };
        let mut stats = VillagerStats::default();
        stats.set_power(4);
        stats.add_discontent(30.0);
        let result = apply_step(&mut stats, &config);
        assert!(result.discontent_gained.abs() < f32::EPSILON);
        assert!(close(stats.discontent(), 30.0));
    }

    #[test]
    fn state_rule_thresholds() {
        let config = DiscontentConfig::default();
        assert_eq!(
            evaluate_state(10.0, VillagerState::Loyal, false, &config),
            StateDecision::Unchanged
        );
        assert_eq!(
            evaluate_state(50.0, VillagerState::Loyal, false, &config),
            StateDecision::Become(VillagerState::Angry)
        );
        assert_eq!(
            evaluate_state(49.9, VillagerState::Angry, false, &config),
            StateDecision::Become(VillagerState::Loyal)
        );
        assert_eq!(
            evaluate_state(100.0, VillagerState::Angry, false, &config),
            StateDecision::BeginRebellion
        );
    }

    #[test]
    fn state_rule_skipped_when_rebel_or_pending() {
        let config = DiscontentConfig::default();
        assert_eq!(
            evaluate_state(0.0, VillagerState::Rebel, false, &config),
            StateDecision::Unchanged
        );
        assert_eq!(
            evaluate_state(0.0, VillagerState::Angry, true, &config),
            StateDecision::Unchanged
        );
    }

    #[test]
    fn nightly_recovery_requires_full_food() {
        let config = DiscontentConfig::default();
        let mut stats = VillagerStats::default();
        stats.add_discontent(40.0);
        let recovered = apply_nightly_recovery(&mut stats, &config);
        assert!(recovered.is_some_and(|r| close(r, 10.0)));
        assert!(close(stats.discontent(), 30.0));

        stats.add_food(-0.5);
        assert!(apply_nightly_recovery(&mut stats, &config).is_none());
    }

    #[test]
    fn nightly_recovery_floors_at_zero() {
        let config = DiscontentConfig::default();
        let mut stats = VillagerStats::default();
        stats.add_discontent(4.0);
        let recovered = apply_nightly_recovery(&mut stats, &config);
        assert!(recovered.is_some_and(|r| close(r, 4.0)));
        assert!(stats.discontent().abs() < f32::EPSILON);
    }
}
