//! Role-specific attack executions.
//!
//! Every role shares targeting, cooldown and stat scaling in
//! [`VillagerCombat`](super::VillagerCombat). Roles differ only in what
//! happens while the damage window is open, which is what an
//! [`AttackExecution`] decides. Executions never touch other entities
//! directly; they return [`CombatEffect`]s for the simulation to apply.

use glam::Vec2;
use hearthguard_types::{EntityCategory, EntityId, Role};

use super::CombatEffect;
use super::attack::SwingGuard;
use super::stats::CombatStats;
use crate::config::{CombatConfig, MageBuffConfig};
use crate::spatial::SpatialQuery;

/// Everything an execution may read while the damage window is open.
#[derive(Clone, Copy)]
pub struct AttackContext<'a> {
    /// The attacking villager.
    pub attacker: EntityId,
    /// Attacker position.
    pub position: Vec2,
    /// Target locked when the swing started.
    pub target: Option<EntityId>,
    /// Cached combat stats.
    pub stats: &'a CombatStats,
    /// Categories the attacker fights.
    pub hostile: &'a [EntityCategory],
    /// Categories the attacker supports.
    pub allies: &'a [EntityCategory],
    /// Spatial snapshot for this frame.
    pub spatial: &'a dyn SpatialQuery,
    /// Mage support tuning.
    pub mage_buff: &'a MageBuffConfig,
}

impl AttackContext<'_> {
    /// The locked target, if it still exists, is hostile, and is in reach.
    fn locked_target_in_range(&self) -> Option<EntityId> {
        let target = self.target?;
        let (position, category) = self.spatial.locate(target)?;
        (self.hostile.contains(&category) && position.distance(self.position) <= self.stats.range)
            .then_some(target)
    }

    const fn damage(&self, target: EntityId) -> CombatEffect {
        CombatEffect::Damage {
            source: self.attacker,
            target,
            amount: self.stats.damage,
        }
    }
}

/// A role's behaviour during the damage window.
///
/// Called every frame the window is open. The swing guard carries over
/// between calls, so each target is struck at most once per swing.
pub trait AttackExecution: core::fmt::Debug + Send {
    /// The role this execution belongs to.
    fn role(&self) -> Role;

    /// Produce the effects of this frame's portion of the swing.
    fn execute(&mut self, ctx: &AttackContext<'_>, guard: &mut SwingGuard) -> Vec<CombatEffect>;
}

/// Commoner: a wide swing that hits every hostile in reach.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwordSwing;

impl AttackExecution for SwordSwing {
    fn role(&self) -> Role {
        Role::Commoner
    }

    fn execute(&mut self, ctx: &AttackContext<'_>, guard: &mut SwingGuard) -> Vec<CombatEffect> {
        ctx.spatial
            .query_candidates_in_radius(ctx.position, ctx.stats.range, ctx.hostile)
            .into_iter()
            .filter(|c| c.id != ctx.attacker && guard.try_mark(c.id))
            .map(|c| ctx.damage(c.id))
            .collect()
    }
}

/// Captain: a banner cleave that hits the nearest few hostiles.
#[derive(Debug, Clone, Copy)]
pub struct BannerCleave {
    max_targets: usize,
}

impl BannerCleave {
    /// A cleave that strikes at most `max_targets` per swing.
    pub const fn new(max_targets: usize) -> Self {
        Self { max_targets }
    }
}

impl AttackExecution for BannerCleave {
    fn role(&self) -> Role {
        Role::Captain
    }

    fn execute(&mut self, ctx: &AttackContext<'_>, guard: &mut SwingGuard) -> Vec<CombatEffect> {
        let budget = self.max_targets.saturating_sub(guard.len());
        let mut effects = Vec::new();
        for candidate in ctx
            .spatial
            .query_candidates_in_radius(ctx.position, ctx.stats.range, ctx.hostile)
        {
            if effects.len() >= budget {
                break;
            }
            if candidate.id != ctx.attacker && guard.try_mark(candidate.id) {
                effects.push(ctx.damage(candidate.id));
            }
        }
        effects
    }
}

/// Farmer: a thrust at the locked target only.
#[derive(Debug, Clone, Copy, Default)]
pub struct PitchforkThrust;

impl AttackExecution for PitchforkThrust {
    fn role(&self) -> Role {
        Role::Farmer
    }

    fn execute(&mut self, ctx: &AttackContext<'_>, guard: &mut SwingGuard) -> Vec<CombatEffect> {
        ctx.locked_target_in_range()
            .filter(|target| guard.try_mark(*target))
            .map(|target| ctx.damage(target))
            .into_iter()
            .collect()
    }
}

/// Mage: a bolt at the locked target, plus a buff and heal for nearby
/// allies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArcaneBolt;

impl AttackExecution for ArcaneBolt {
    fn role(&self) -> Role {
        Role::Mage
    }

    fn execute(&mut self, ctx: &AttackContext<'_>, guard: &mut SwingGuard) -> Vec<CombatEffect> {
        let mut effects = Vec::new();
        if let Some(target) = ctx.locked_target_in_range()
            && guard.try_mark(target)
        {
            effects.push(ctx.damage(target));
        }

        let allies = ctx
            .spatial
            .query_candidates_in_radius(ctx.position, ctx.mage_buff.radius, ctx.allies);
        for ally in allies {
            if ally.id == ctx.attacker || !guard.try_mark(ally.id) {
                continue;
            }
            effects.push(CombatEffect::Buff {
                source: ctx.attacker,
                target: ally.id,
                factor: ctx.mage_buff.factor,
                duration: ctx.mage_buff.duration_seconds,
            });
            if ctx.mage_buff.heal > 0.0 {
                effects.push(CombatEffect::Heal {
                    source: ctx.attacker,
                    target: ally.id,
                    amount: ctx.mage_buff.heal,
                });
            }
        }
        effects
    }
}

/// The standard damage dealer for a role. Builders carry none.
pub fn dealer_for_role(role: Role, config: &CombatConfig) -> Option<Box<dyn AttackExecution>> {
    match role {
        Role::Commoner => Some(Box::new(SwordSwing)),
        Role::Captain => Some(Box::new(BannerCleave::new(config.cleave_max_targets))),
        Role::Farmer => Some(Box::new(PitchforkThrust)),
        Role::Mage => Some(Box::new(ArcaneBolt)),
        Role::Builder => None,
    }
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use hearthguard_types::VillagerState;

    use super::*;
    use crate::combat::targeting::{ally_categories, hostile_categories};
    use crate::spatial::SpatialIndex;

    fn stats(range: f32) -> CombatStats {
        CombatStats {
            damage: 10.0,
            cooldown: 1.0,
            range,
            detection_radius: 8.0,
        }
    }

    fn ctx<'a>(
        attacker: EntityId,
        target: Option<EntityId>,
        stats: &'a CombatStats,
        spatial: &'a SpatialIndex,
        mage_buff: &'a MageBuffConfig,
    ) -> AttackContext<'a> {
        AttackContext {
            attacker,
            position: Vec2::ZERO,
            target,
            stats,
            hostile: hostile_categories(VillagerState::Loyal),
            allies: ally_categories(VillagerState::Loyal),
            spatial,
            mage_buff,
        }
    }

    fn raiders(spatial: &mut SpatialIndex, count: usize) -> Vec<EntityId> {
        (0..count)
            .map(|i| {
                let id = EntityId::new();
                spatial.insert(id, EntityCategory::Hostile, Vec2::new(0.2 * (i as f32 + 1.0), 0.0));
                id
            })
            .collect()
    }

    fn damaged(effects: &[CombatEffect]) -> Vec<EntityId> {
        effects
            .iter()
            .filter_map(|e| match e {
                CombatEffect::Damage { target, .. } => Some(*target),
                CombatEffect::Buff { .. } | CombatEffect::Heal { .. } => None,
            })
            .collect()
    }

    #[test]
    fn sword_hits_each_target_once_per_swing() {
        let mut spatial = SpatialIndex::new();
        let ids = raiders(&mut spatial, 2);
        let stats = stats(2.0);
        let buff = MageBuffConfig::default();
        let me = EntityId::new();
        let ctx = ctx(me, None, &stats, &spatial, &buff);
        let mut guard = SwingGuard::new();

        let first = SwordSwing.execute(&ctx, &mut guard);
        assert_eq!(damaged(&first), ids);
        let repeat = SwordSwing.execute(&ctx, &mut guard);
        assert!(repeat.is_empty());
    }

    #[test]
    fn cleave_caps_targets_per_swing() {
        let mut spatial = SpatialIndex::new();
        let ids = raiders(&mut spatial, 5);
        let stats = stats(2.0);
        let buff = MageBuffConfig::default();
        let ctx = ctx(EntityId::new(), None, &stats, &spatial, &buff);
        let mut guard = SwingGuard::new();
        let mut cleave = BannerCleave::new(3);

        let hits = damaged(&cleave.execute(&ctx, &mut guard));
        assert_eq!(hits, ids.iter().take(3).copied().collect::<Vec<_>>());
        assert!(cleave.execute(&ctx, &mut guard).is_empty());
    }

    #[test]
    fn pitchfork_only_hits_locked_target() {
        let mut spatial = SpatialIndex::new();
        let ids = raiders(&mut spatial, 3);
        let locked = ids.get(2).copied();
        let stats = stats(2.0);
        let buff = MageBuffConfig::default();
        let ctx = ctx(EntityId::new(), locked, &stats, &spatial, &buff);
        let mut guard = SwingGuard::new();

        let hits = damaged(&PitchforkThrust.execute(&ctx, &mut guard));
        assert_eq!(hits.first().copied(), locked);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn pitchfork_whiffs_when_target_vanished() {
        let spatial = SpatialIndex::new();
        let stats = stats(2.0);
        let buff = MageBuffConfig::default();
        let ctx = ctx(EntityId::new(), Some(EntityId::new()), &stats, &spatial, &buff);
        let mut guard = SwingGuard::new();
        assert!(PitchforkThrust.execute(&ctx, &mut guard).is_empty());
    }

    #[test]
    fn bolt_supports_allies_but_not_self() {
        let mut spatial = SpatialIndex::new();
        let me = EntityId::new();
        let ally = EntityId::new();
        spatial.insert(me, EntityCategory::LoyalVillager, Vec2::ZERO);
        spatial.insert(ally, EntityCategory::LoyalVillager, Vec2::new(1.0, 0.0));
        let stats = stats(6.0);
        let buff = MageBuffConfig::default();
        let ctx = ctx(me, None, &stats, &spatial, &buff);
        let mut guard = SwingGuard::new();

        let effects = ArcaneBolt.execute(&ctx, &mut guard);
        assert_eq!(effects.len(), 2);
        assert!(effects.iter().all(|e| match e {
            CombatEffect::Buff { target, .. } | CombatEffect::Heal { target, .. } =>
                *target == ally,
            CombatEffect::Damage { .. } => false,
        }));
    }

    #[test]
    fn builders_have_no_dealer() {
        let config = CombatConfig::default();
        assert!(dealer_for_role(Role::Builder, &config).is_none());
        for role in [Role::Commoner, Role::Captain, Role::Farmer, Role::Mage] {
            assert_eq!(dealer_for_role(role, &config).map(|d| d.role()), Some(role));
        }
    }
}
