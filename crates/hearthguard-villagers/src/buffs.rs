//! Time-limited damage buffs cast by mages.
//!
//! Buffs from different mages stack multiplicatively. A second cast from
//! the same mage refreshes that mage's buff instead of stacking with it.

use std::collections::BTreeMap;

use hearthguard_types::EntityId;

/// One active buff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveBuff {
    /// Damage multiplier.
    pub factor: f32,
    /// Seconds until it expires.
    pub remaining: f32,
}

/// Active buffs on one villager, keyed by caster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MageBuffs {
    active: BTreeMap<EntityId, ActiveBuff>,
}

impl MageBuffs {
    /// No buffs.
    pub const fn new() -> Self {
        Self {
            active: BTreeMap::new(),
        }
    }

    /// Add or refresh the buff from `source`.
    pub fn apply(&mut self, source: EntityId, factor: f32, duration: f32) {
        if duration <= 0.0 {
            return;
        }
        self.active.insert(
            source,
            ActiveBuff {
                factor,
                remaining: duration,
            },
        );
    }

    /// Count down every buff by `dt` and drop the expired ones.
    ///
    /// Returns `true` when at least one buff expired.
    pub fn purge_expired(&mut self, dt: f32) -> bool {
        let before = self.active.len();
        self.active.retain(|_, buff| {
            buff.remaining -= dt;
            buff.remaining > 0.0
        });
        self.active.len() != before
    }

    /// Combined multiplier: the product of every active factor, or 1.
    pub fn multiplier(&self) -> f32 {
        self.active.values().map(|b| b.factor).product()
    }

    /// Number of active buffs.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no buff is active.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Drop every buff.
    pub fn clear(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffs_from_different_mages_stack() {
        let mut buffs = MageBuffs::new();
        buffs.apply(EntityId::new(), 1.25, 5.0);
        buffs.apply(EntityId::new(), 1.2, 5.0);
        assert!((buffs.multiplier() - 1.5).abs() < 1e-5);
    }

    #[test]
    fn same_mage_refreshes() {
        let mut buffs = MageBuffs::new();
        let mage = EntityId::new();
        buffs.apply(mage, 1.25, 1.0);
        buffs.apply(mage, 1.25, 5.0);
        assert_eq!(buffs.len(), 1);
        assert!(!buffs.purge_expired(2.0));
        assert!((buffs.multiplier() - 1.25).abs() < 1e-5);
    }

    #[test]
    fn expired_buffs_are_purged() {
        let mut buffs = MageBuffs::new();
        buffs.apply(EntityId::new(), 1.25, 1.0);
        buffs.apply(EntityId::new(), 1.5, 3.0);
        assert!(buffs.purge_expired(1.0));
        assert_eq!(buffs.len(), 1);
        assert!((buffs.multiplier() - 1.5).abs() < 1e-5);
        assert!(buffs.purge_expired(5.0));
        assert!(buffs.is_empty());
        assert!((buffs.multiplier() - 1.0).abs() < f32::EPSILON);
    }
}
