//! Hit points and the polymorphic damage contract.

use hearthguard_types::EntityId;

/// Anything that can be hurt or healed.
///
/// Attackers apply damage through this trait without knowing the concrete
/// kind of target.
pub trait Damageable {
    /// Apply damage. Returns the hit points actually removed.
    fn take_damage(&mut self, amount: f32, source: Option<EntityId>) -> f32;

    /// Restore hit points, capped at the maximum. Returns the amount
    /// actually restored.
    fn heal(&mut self, amount: f32) -> f32;

    /// Current hit points.
    fn current_hp(&self) -> f32;

    /// Maximum hit points.
    fn max_hp(&self) -> f32;

    /// Whether hit points have reached zero.
    fn is_dead(&self) -> bool {
        self.current_hp() <= 0.0
    }
}

/// A plain hit-point pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    current: f32,
    max: f32,
    last_attacker: Option<EntityId>,
}

impl Health {
    /// A full pool with `max` hit points.
    pub const fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            last_attacker: None,
        }
    }

    /// Who dealt the most recent damage, if anyone.
    pub const fn last_attacker(&self) -> Option<EntityId> {
        self.last_attacker
    }

    /// Change the maximum, keeping the same fraction of health.
    pub const fn set_max(&mut self, max: f32) {
        if self.max <= 0.0 || max <= 0.0 {
            self.max = max.max(0.0);
            self.current = self.current.min(self.max);
            return;
        }
        let ratio = self.current / self.max;
        self.max = max;
        self.current = (ratio * max).clamp(0.0, max);
    }

    /// Multiply both current and maximum hit points.
    pub const fn scale(&mut self, multiplier: f32) {
        if multiplier <= 0.0 {
            return;
        }
        self.max *= multiplier;
        self.current = (self.current * multiplier).min(self.max);
    }
}

impl Damageable for Health {
    fn take_damage(&mut self, amount: f32, source: Option<EntityId>) -> f32 {
        if amount <= 0.0 || self.current <= 0.0 {
            return 0.0;
        }
        let dealt = amount.min(self.current);
        self.current -= dealt;
        if source.is_some() {
            self.last_attacker = source;
        }
        dealt
    }

    fn heal(&mut self, amount: f32) -> f32 {
        if amount <= 0.0 || self.current <= 0.0 {
            return 0.0;
        }
        let restored = amount.min(self.max - self.current).max(0.0);
        self.current += restored;
        restored
    }

    fn current_hp(&self) -> f32 {
        self.current
    }

    fn max_hp(&self) -> f32 {
        self.max
    }
}
