//! Per-villager mutable state.
//!
//! [`VillagerStats`] keeps its fields private so the bounds hold no matter
//! who holds a `&mut`: food stays in `[0, 1]`, discontent in `[0, 100]`,
//! and tier is always the one derived from power.

use hearthguard_types::Tier;

/// Upper bound of discontent.
pub const MAX_DISCONTENT: f32 = 100.0;

/// Upper bound of food.
pub const MAX_FOOD: f32 = 1.0;

/// Derive the tier for an allocated power amount.
pub const fn tier_for_power(power: u32) -> Tier {
    Tier::from_power(power)
}

/// Power, food, discontent, tier and activity of one villager.
#[derive(Debug, Clone, PartialEq)]
pub struct VillagerStats {
    power: u32,
    food: f32,
    discontent: f32,
    tier: Tier,
    is_active: bool,
}

impl Default for VillagerStats {
    fn default() -> Self {
        Self {
            power: 0,
            food: MAX_FOOD,
            discontent: 0.0,
            tier: Tier::Zero,
            is_active: true,
        }
    }
}

impl VillagerStats {
    /// Power allocated this cycle.
    pub const fn power(&self) -> u32 {
        self.power
    }

    /// Food level in `[0, 1]`.
    pub const fn food(&self) -> f32 {
        self.food
    }

    /// Discontent in `[0, 100]`.
    pub const fn discontent(&self) -> f32 {
        self.discontent
    }

    /// Tier derived from power.
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Whether the supporting structure still stands.
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Set allocated power and re-derive the tier.
    ///
    /// Returns the previous tier when it changed.
    pub fn set_power(&mut self, power: u32) -> Option<Tier> {
        self.power = power;
        let tier = tier_for_power(power);
        if tier == self.tier {
            return None;
        }
        let previous = self.tier;
        self.tier = tier;
        Some(previous)
    }

    /// Add (or with a negative amount, remove) food, clamped to `[0, 1]`.
    ///
    /// Returns the change actually applied.
    pub const fn add_food(&mut self, amount: f32) -> f32 {
        if amount.is_nan() {
            return 0.0;
        }
        let before = self.food;
        self.food = (self.food + amount).clamp(0.0, MAX_FOOD);
        self.food - before
    }

    /// Add (or remove) discontent, clamped to `[0, 100]`.
    ///
    /// Returns the change actually applied.
    pub(crate) const fn add_discontent(&mut self, amount: f32) -> f32 {
        if amount.is_nan() {
            return 0.0;
        }
        let before = self.discontent;
        self.discontent = (self.discontent + amount).clamp(0.0, MAX_DISCONTENT);
        self.discontent - before
    }

    pub(crate) const fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_round_trips_through_power() {
        let mut stats = VillagerStats::default();
        for power in [0_u32, 1, 2, 3, 4, 5, 50] {
            stats.set_power(power);
            assert_eq!(stats.tier(), Tier::from_power(power));
        }
    }

    #[test]
    fn set_power_reports_tier_change() {
        let mut stats = VillagerStats::default();
        assert_eq!(stats.set_power(1), None);
        assert_eq!(stats.set_power(2), Some(Tier::Zero));
        assert_eq!(stats.set_power(3), None);
        assert_eq!(stats.set_power(4), Some(Tier::One));
    }

    #[test]
    fn food_clamped() {
        let mut stats = VillagerStats::default();
        assert!(stats.add_food(0.5).abs() < f32::EPSILON);
        stats.add_food(-3.0);
        assert!(stats.food().abs() < f32::EPSILON);
    }

    #[test]
    fn discontent_stays_in_range_for_any_deltas() {
        let mut stats = VillagerStats::default();
        for delta in [1000.0_f32, -5000.0, 42.0, 73.5, -1.0, f32::MAX, -f32::MAX] {
            stats.add_discontent(delta);
            assert!((0.0..=MAX_DISCONTENT).contains(&stats.discontent()));
        }
    }
}
