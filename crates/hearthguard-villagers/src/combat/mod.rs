//! Villager combat: targeting, cooldown gating, stat scaling, and attacks.
//!
//! [`VillagerCombat`] is shared by every role. It owns the cached
//! [`CombatStats`], the active mage buffs, the captain influence bonus,
//! the current target and the in-flight [`AttackRoutine`]. The only
//! role-specific piece is the boxed [`AttackExecution`] that decides what
//! the damage window does.
//!
//! Combat never mutates other entities. A frame's hits, buffs and heals
//! come back as [`CombatEffect`]s that the simulation applies by ID.

pub mod attack;
pub mod roles;
pub mod stats;
pub mod targeting;

use std::sync::Arc;

use glam::Vec2;
use hearthguard_types::{EntityId, Role, Tier, VillagerState};
use tracing::{debug, warn};

pub use attack::{AttackPhase, AttackRoutine, AttackStep, SwingGuard};
pub use roles::{AttackContext, AttackExecution, dealer_for_role};
pub use stats::{CombatStats, StatInputs, compute_stats};

use crate::animation::Animator;
use crate::buffs::MageBuffs;
use crate::config::VillagerConfig;
use crate::influence::InfluenceBonus;
use crate::movement::{Destination, Movement};
use crate::spatial::{Candidate, SpatialQuery};

/// Lowest efficiency the combat component accepts.
const MIN_EFFICIENCY: f32 = 0.01;

/// Fraction of attack range at which a chasing villager stops.
const CHASE_STOP_FRACTION: f32 = 0.9;

/// An effect on another entity produced by an attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatEffect {
    /// Remove hit points.
    Damage {
        /// Attacker.
        source: EntityId,
        /// Victim.
        target: EntityId,
        /// Hit points.
        amount: f32,
    },
    /// Grant a mage damage buff.
    Buff {
        /// Casting mage.
        source: EntityId,
        /// Recipient.
        target: EntityId,
        /// Damage multiplier.
        factor: f32,
        /// Seconds it lasts.
        duration: f32,
    },
    /// Restore hit points.
    Heal {
        /// Casting mage.
        source: EntityId,
        /// Recipient.
        target: EntityId,
        /// Hit points.
        amount: f32,
    },
}

impl CombatEffect {
    /// The entity the effect lands on.
    pub const fn target(&self) -> EntityId {
        match self {
            Self::Damage { target, .. } | Self::Buff { target, .. } | Self::Heal { target, .. } => {
                *target
            }
        }
    }
}

/// Collaborators and inputs for one combat frame.
pub struct CombatFrame<'a> {
    /// Seconds since the last frame.
    pub dt: f32,
    /// Whether the villager's building still stands.
    pub is_active: bool,
    /// Villager position.
    pub position: Vec2,
    /// Spatial snapshot for this frame.
    pub spatial: &'a dyn SpatialQuery,
    /// The villager's movement collaborator.
    pub movement: &'a mut dyn Movement,
    /// The villager's animation collaborator.
    pub animator: &'a mut dyn Animator,
}

/// Result of one combat frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatOutcome {
    /// Hits, buffs and heals to apply.
    pub effects: Vec<CombatEffect>,
    /// `Some(new_target)` when the target changed this frame.
    pub target_changed: Option<Option<EntityId>>,
}

/// Combat component shared by every role.
#[derive(Debug)]
pub struct VillagerCombat {
    owner: EntityId,
    role: Role,
    config: Arc<VillagerConfig>,
    tier: Tier,
    state: VillagerState,
    stats: CombatStats,
    efficiency: f32,
    buffs: MageBuffs,
    influence: Option<(EntityId, InfluenceBonus)>,
    target: Option<EntityId>,
    frames_since_retarget: u32,
    since_last_attack: f32,
    attack: Option<AttackRoutine>,
    dealer: Option<Box<dyn AttackExecution>>,
}

impl VillagerCombat {
    /// Create the combat component for `owner`.
    ///
    /// A missing `dealer` is a wiring problem, not a fatal one: it is
    /// reported and the villager simply never deals damage.
    pub fn new(
        owner: EntityId,
        role: Role,
        config: Arc<VillagerConfig>,
        dealer: Option<Box<dyn AttackExecution>>,
    ) -> Self {
        if dealer.is_none() {
            warn!(villager = %owner, %role, "No damage dealer wired, attacks disabled");
        }
        let stats = compute_stats(
            &config.combat,
            StatInputs {
                role,
                tier: Tier::Zero,
                state: VillagerState::Loyal,
                efficiency: 1.0,
                buff_multiplier: 1.0,
                influence: None,
            },
        );
        let frames_since_retarget = config.combat.retarget_frames;
        Self {
            owner,
            role,
            config,
            tier: Tier::Zero,
            state: VillagerState::Loyal,
            stats,
            efficiency: 1.0,
            buffs: MageBuffs::new(),
            influence: None,
            target: None,
            frames_since_retarget,
            since_last_attack: f32::MAX,
            attack: None,
            dealer,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Cached combat stats.
    pub const fn stats(&self) -> &CombatStats {
        &self.stats
    }

    /// Current efficiency in `(0, 1]`.
    pub const fn efficiency(&self) -> f32 {
        self.efficiency
    }

    /// Current target.
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Whether an attack is in flight.
    pub const fn is_attacking(&self) -> bool {
        self.attack.is_some()
    }

    /// Phase of the in-flight attack.
    pub fn attack_phase(&self) -> Option<AttackPhase> {
        self.attack.as_ref().map(AttackRoutine::phase)
    }

    /// Whether a damage dealer is wired.
    pub const fn has_dealer(&self) -> bool {
        self.dealer.is_some()
    }

    /// Active mage buffs.
    pub const fn buffs(&self) -> &MageBuffs {
        &self.buffs
    }

    /// The influencing captain and its bonus.
    pub fn influence(&self) -> Option<(EntityId, &InfluenceBonus)> {
        self.influence.as_ref().map(|(captain, bonus)| (*captain, bonus))
    }

    /// Cooldown stretched by low efficiency.
    pub const fn effective_cooldown(&self) -> f32 {
        self.stats.cooldown / self.efficiency
    }

    /// Detection radius scaled by efficiency.
    pub fn effective_detection(&self) -> f32 {
        targeting::effective_detection(self.stats.detection_radius, self.efficiency)
    }

    /// Multiplier on incoming damage from captain influence.
    pub fn incoming_damage_multiplier(&self) -> f32 {
        self.influence
            .as_ref()
            .map_or(1.0, |(_, bonus)| 1.0 - bonus.damage_reduction)
    }

    /// Multiplier on walking speed from captain influence.
    pub fn speed_multiplier(&self) -> f32 {
        self.influence
            .as_ref()
            .map_or(1.0, |(_, bonus)| 1.0 + bonus.speed_boost)
    }

    // -----------------------------------------------------------------------
    // Stat inputs
    // -----------------------------------------------------------------------

    /// Recompute cached stats from tier, state, efficiency, buffs and influence.
    pub fn recompute_stats(&mut self) {
        self.stats = compute_stats(
            &self.config.combat,
            StatInputs {
                role: self.role,
                tier: self.tier,
                state: self.state,
                efficiency: self.efficiency,
                buff_multiplier: self.buffs.multiplier(),
                influence: self.influence.as_ref().map(|(_, bonus)| bonus),
            },
        );
    }

    /// Push a new efficiency from the efficiency model.
    pub fn set_efficiency(&mut self, efficiency: f32) {
        let efficiency = efficiency.clamp(MIN_EFFICIENCY, 1.0);
        if (self.efficiency - efficiency).abs() > f32::EPSILON {
            self.efficiency = efficiency;
            self.recompute_stats();
        }
    }

    /// Push a new tier.
    pub fn set_tier(&mut self, tier: Tier) {
        if self.tier != tier {
            self.tier = tier;
            self.recompute_stats();
        }
    }

    /// Push a new morale state.
    ///
    /// Turning Rebel switches sides: the in-flight attack is cancelled,
    /// the old target dropped, loyal-side buffs and influence cleared, and
    /// a new target is searched for on the next frame.
    pub fn set_state(&mut self, state: VillagerState) {
        if self.state == state {
            return;
        }
        self.state = state;
        if state == VillagerState::Rebel {
            self.cancel_attack();
            self.target = None;
            self.buffs.clear();
            self.influence = None;
            self.frames_since_retarget = self.config.combat.retarget_frames;
        }
        self.recompute_stats();
    }

    /// Add or refresh a mage buff.
    pub fn apply_mage_buff(&mut self, source: EntityId, factor: f32, duration: f32) {
        self.buffs.apply(source, factor, duration);
        self.recompute_stats();
    }

    /// Apply a captain's bonus bundle, replacing any previous one.
    ///
    /// Returns `true` when this captain was not already the influencer.
    pub fn apply_captain_influence(&mut self, captain: EntityId, bonus: InfluenceBonus) -> bool {
        let is_new = self.influence.as_ref().is_none_or(|(c, _)| *c != captain);
        self.influence = Some((captain, bonus));
        self.recompute_stats();
        is_new
    }

    /// Remove `captain`'s bonus bundle.
    ///
    /// A no-op returning `false` if `captain` is not the current
    /// influencer, so repeated removals never stack.
    pub fn remove_captain_influence(&mut self, captain: EntityId) -> bool {
        if self.influence.as_ref().is_some_and(|(c, _)| *c == captain) {
            self.influence = None;
            self.recompute_stats();
            true
        } else {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Behaviour
    // -----------------------------------------------------------------------

    /// Whether the villager should be fighting this frame.
    pub fn can_combat(&self, is_active: bool, position: Vec2, spatial: &dyn SpatialQuery) -> bool {
        targeting::can_combat(
            is_active,
            self.state,
            position,
            self.effective_detection(),
            spatial,
        )
    }

    /// Pick the nearest hostile within the scaled detection radius and
    /// make it the target. Clears the target when none is found.
    pub fn select_target(&mut self, position: Vec2, spatial: &dyn SpatialQuery) -> Option<Candidate> {
        let found = targeting::nearest_target(
            self.owner,
            position,
            self.effective_detection(),
            targeting::hostile_categories(self.state),
            spatial,
        );
        self.target = found.map(|c| c.id);
        found
    }

    /// Start an attack if one is allowed.
    ///
    /// Requires a wired dealer, no attack already in flight, a target
    /// within range, and `cooldown / efficiency` seconds since the last
    /// attack started.
    pub fn try_start_attack(&mut self, distance_to_target: Option<f32>) -> bool {
        if self.dealer.is_none() || self.attack.is_some() {
            return false;
        }
        let Some(distance) = distance_to_target else {
            return false;
        };
        if distance > self.stats.range || self.since_last_attack < self.effective_cooldown() {
            return false;
        }
        self.attack = Some(AttackRoutine::new(self.target));
        self.since_last_attack = 0.0;
        true
    }

    /// Abort the in-flight attack. The swing guard is dropped with the
    /// routine, so no partial damage window survives. Returns `true` if an
    /// attack was running.
    pub fn cancel_attack(&mut self) -> bool {
        let cancelled = self.attack.take().is_some();
        if cancelled {
            debug!(villager = %self.owner, "Attack cancelled");
        }
        cancelled
    }

    /// Run one combat frame.
    pub fn tick(&mut self, frame: CombatFrame<'_>) -> CombatOutcome {
        let mut outcome = CombatOutcome::default();

        if self.buffs.purge_expired(frame.dt) {
            self.recompute_stats();
        }
        self.since_last_attack += frame.dt;

        if !self.can_combat(frame.is_active, frame.position, frame.spatial) {
            self.cancel_attack();
            if self.target.take().is_some() {
                clear_chase(frame.movement);
                outcome.target_changed = Some(None);
            }
            return outcome;
        }

        let hostile = targeting::hostile_categories(self.state);
        let interval = targeting::retarget_interval(self.state, &self.config.combat);

        // Stale target: gone, or switched sides.
        if let Some(target) = self.target {
            let valid = frame
                .spatial
                .locate(target)
                .is_some_and(|(_, category)| hostile.contains(&category));
            if !valid {
                self.target = None;
                self.frames_since_retarget = interval;
                clear_chase(frame.movement);
                outcome.target_changed = Some(None);
            }
        }

        self.frames_since_retarget = self.frames_since_retarget.saturating_add(1);
        if self.frames_since_retarget >= interval {
            self.frames_since_retarget = 0;
            let previous = self.target;
            let found = self.select_target(frame.position, frame.spatial);
            match found {
                Some(candidate) => {
                    let stop = self.stats.range * CHASE_STOP_FRACTION;
                    frame.movement.set_destination_entity(candidate.id, stop);
                }
                None => clear_chase(frame.movement),
            }
            if self.target != previous {
                outcome.target_changed = Some(self.target);
            }
        }

        let distance = self
            .target
            .and_then(|t| frame.spatial.locate(t))
            .map(|(position, _)| position.distance(frame.position));

        if self.attack.is_none() && self.try_start_attack(distance) {
            debug!(villager = %self.owner, role = %self.role, "Attack started");
        }

        let allies = targeting::ally_categories(self.state);
        let timing = self.config.combat.timing;
        let mut finished = false;
        if let Some(routine) = self.attack.as_mut() {
            let step = routine.advance(frame.dt, &timing);
            if step == AttackStep::Strike {
                frame.animator.play_attack_anim(self.role);
            }
            if matches!(step, AttackStep::Strike | AttackStep::Active)
                && let Some(dealer) = self.dealer.as_mut()
            {
                let ctx = AttackContext {
                    attacker: self.owner,
                    position: frame.position,
                    target: routine.target(),
                    stats: &self.stats,
                    hostile,
                    allies,
                    spatial: frame.spatial,
                    mage_buff: &self.config.mage_buff,
                };
                outcome.effects = dealer.execute(&ctx, routine.guard_mut());
            }
            finished = step == AttackStep::Finished;
        }
        if finished {
            self.attack = None;
        }

        outcome
    }
}

/// Drop a stale chase without disturbing a point destination set by
/// captain positioning.
fn clear_chase(movement: &mut dyn Movement) {
    if matches!(movement.destination(), Destination::Entity { .. }) {
        movement.clear_destination();
    }
}

#[cfg(test)]
mod tests {
    use hearthguard_types::EntityCategory;

    use super::*;
    use crate::animation::NullAnimator;
    use crate::movement::StraightLineMover;
    use crate::spatial::SpatialIndex;

    fn combat(role: Role) -> VillagerCombat {
        let config = Arc::new(VillagerConfig::default());
        let dealer = dealer_for_role(role, &config.combat);
        VillagerCombat::new(EntityId::new(), role, config, dealer)
    }

    fn run(
        combat: &mut VillagerCombat,
        spatial: &SpatialIndex,
        mover: &mut StraightLineMover,
        frames: usize,
    ) -> Vec<CombatOutcome> {
        let mut animator = NullAnimator;
        let mut outcomes = Vec::with_capacity(frames);
        for _ in 0..frames {
            outcomes.push(combat.tick(CombatFrame {
                dt: 1.0 / 60.0,
                is_active: true,
                position: Vec2::ZERO,
                spatial,
                movement: &mut *mover,
                animator: &mut animator,
            }));
        }
        outcomes
    }

    #[test]
    fn low_efficiency_stretches_cooldown() {
        let mut combat = combat(Role::Commoner);
        combat.set_efficiency(0.5);
        assert!((combat.effective_cooldown() - 2.4).abs() < 1e-4);
    }

    #[test]
    fn efficiency_change_rescales_cached_damage() {
        let mut combat = combat(Role::Commoner);
        let base = combat.stats().damage;
        combat.set_efficiency(0.5);
        assert!((combat.stats().damage - base * 0.5).abs() < 1e-4);
        combat.set_efficiency(1.0);
        assert!((combat.stats().damage - base).abs() < 1e-4);
    }

    #[test]
    fn attack_gating_respects_cooldown_and_range() {
        let mut combat = combat(Role::Commoner);
        assert!(!combat.try_start_attack(None));
        assert!(!combat.try_start_attack(Some(5.0)));
        assert!(combat.try_start_attack(Some(1.0)));
        assert!(combat.is_attacking());
        assert!(!combat.try_start_attack(Some(1.0)));
        assert!(combat.cancel_attack());
        // Cooldown restarted when the first attack began.
        assert!(!combat.try_start_attack(Some(1.0)));
    }

    #[test]
    fn builder_never_attacks() {
        let mut combat = combat(Role::Builder);
        assert!(!combat.has_dealer());
        assert!(!combat.try_start_attack(Some(0.1)));
    }

    #[test]
    fn captain_influence_removal_is_idempotent() {
        let mut combat = combat(Role::Commoner);
        let base = combat.stats().damage;
        let captain = EntityId::new();
        let bonus = InfluenceBonus {
            damage_boost: 0.2,
            speed_boost: 0.1,
            damage_reduction: 0.1,
            cooldown_reduction: 0.1,
        };
        assert!(combat.apply_captain_influence(captain, bonus));
        assert!(!combat.apply_captain_influence(captain, bonus));
        assert!((combat.stats().damage - base * 1.2).abs() < 1e-4);

        assert!(!combat.remove_captain_influence(EntityId::new()));
        assert!(combat.remove_captain_influence(captain));
        assert!(!combat.remove_captain_influence(captain));
        assert!((combat.stats().damage - base).abs() < 1e-4);
    }

    #[test]
    fn mage_buffs_expire_and_restore_damage() {
        let mut combat = combat(Role::Commoner);
        let base = combat.stats().damage;
        combat.apply_mage_buff(EntityId::new(), 1.25, 0.05);
        assert!((combat.stats().damage - base * 1.25).abs() < 1e-4);

        let spatial = SpatialIndex::new();
        let mut mover = StraightLineMover::new(Vec2::ZERO, 1.0);
        run(&mut combat, &spatial, &mut mover, 5);
        assert!((combat.stats().damage - base).abs() < 1e-4);
    }

    #[test]
    fn acquires_nearest_raider_and_hits_it_once() {
        let mut combat = combat(Role::Commoner);
        let mut spatial = SpatialIndex::new();
        let raider = EntityId::new();
        spatial.insert(raider, EntityCategory::Hostile, Vec2::new(1.0, 0.0));
        spatial.insert(EntityId::new(), EntityCategory::Hostile, Vec2::new(7.0, 0.0));
        let mut mover = StraightLineMover::new(Vec2::ZERO, 1.0);

        let outcomes = run(&mut combat, &spatial, &mut mover, 40);
        assert_eq!(
            outcomes.first().and_then(|o| o.target_changed),
            Some(Some(raider))
        );
        let hits: usize = outcomes
            .iter()
            .flat_map(|o| o.effects.iter())
            .filter(|e| e.target() == raider)
            .count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn vanished_target_is_reacquired_immediately() {
        let mut combat = combat(Role::Farmer);
        let mut spatial = SpatialIndex::new();
        let first = EntityId::new();
        let second = EntityId::new();
        spatial.insert(first, EntityCategory::Hostile, Vec2::new(1.0, 0.0));
        spatial.insert(second, EntityCategory::Hostile, Vec2::new(3.0, 0.0));
        let mut mover = StraightLineMover::new(Vec2::ZERO, 1.0);
        run(&mut combat, &spatial, &mut mover, 1);
        assert_eq!(combat.target(), Some(first));

        spatial.remove(first);
        let outcome = run(&mut combat, &spatial, &mut mover, 1);
        assert_eq!(combat.target(), Some(second));
        assert_eq!(
            outcome.first().and_then(|o| o.target_changed),
            Some(Some(second))
        );
    }

    #[test]
    fn no_threat_clears_target_and_chase() {
        let mut combat = combat(Role::Commoner);
        let mut spatial = SpatialIndex::new();
        let raider = EntityId::new();
        spatial.insert(raider, EntityCategory::Hostile, Vec2::new(2.0, 0.0));
        let mut mover = StraightLineMover::new(Vec2::ZERO, 1.0);
        run(&mut combat, &spatial, &mut mover, 1);
        assert!(matches!(mover.destination(), Destination::Entity { .. }));

        let empty = SpatialIndex::new();
        run(&mut combat, &empty, &mut mover, 1);
        assert!(combat.target().is_none());
        assert_eq!(mover.destination(), Destination::None);
    }

    #[test]
    fn turning_rebel_cancels_attack_and_drops_target() {
        let mut combat = combat(Role::Commoner);
        combat.set_state(VillagerState::Angry);
        assert!(combat.try_start_attack(Some(0.5)));
        combat.set_state(VillagerState::Rebel);
        assert!(!combat.is_attacking());
        assert!(combat.target().is_none());
        assert!((combat.stats().damage - 15.0).abs() < 1e-4);
    }
}
