//! The villager facade.
//!
//! A [`Villager`] owns its stats, morale state, rebellion telegraph,
//! health, combat component and the movement and animation collaborators.
//! It is assembled once by [`VillagerBuilder`] with every sub-system for
//! its role already present.
//!
//! Per-frame work happens in [`Villager::tick`]:
//!
//! 1. Advance the rebellion telegraph and commit if it has run out.
//! 2. Run fixed accrual steps (food decay, passive discontent) for the
//!    elapsed time, re-evaluating state after each.
//! 3. Push the efficiency for the new food and state into combat.
//! 4. Run the combat frame, then move.
//!
//! Everything that affects other entities comes back in [`VillagerTick`]
//! for the simulation to apply.

use std::sync::Arc;

use glam::Vec2;
use hearthguard_types::{
    EntityCategory, EntityId, Faction, FlashColor, HolderId, Role, SimEvent, VillagerSnapshot,
    VillagerState,
};
use tracing::{debug, info};

use crate::animation::{Animator, TracingAnimator};
use crate::combat::{AttackExecution, CombatEffect, CombatFrame, VillagerCombat, dealer_for_role};
use crate::config::VillagerConfig;
use crate::discontent::{self, StateDecision};
use crate::efficiency::combat_efficiency;
use crate::error::VillagerError;
use crate::health::{Damageable, Health};
use crate::influence::InfluenceBonus;
use crate::movement::{Movement, StraightLineMover};
use crate::rebellion::RebellionSequence;
use crate::spatial::SpatialQuery;
use crate::stats::{MAX_DISCONTENT, VillagerStats};

/// Slack on the accrual accumulator so float drift never drops a step.
const STEP_EPSILON: f32 = 1e-4;

/// Length of the flash played on a state change.
const STATE_FLASH_SECONDS: f32 = 0.3;

/// Length of the flash played when hit or buffed.
const HIT_FLASH_SECONDS: f32 = 0.1;

/// What one villager frame produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VillagerTick {
    /// Notifications, in the order they happened.
    pub events: Vec<SimEvent>,
    /// Hits, buffs and heals on other entities.
    pub effects: Vec<CombatEffect>,
    /// Whether the villager committed to rebellion this frame.
    pub rebelled: bool,
}

/// One villager.
#[derive(Debug)]
pub struct Villager {
    id: EntityId,
    name: String,
    role: Role,
    holder: HolderId,
    building: Option<EntityId>,
    config: Arc<VillagerConfig>,
    stats: VillagerStats,
    state: VillagerState,
    faction: Faction,
    rebellion: RebellionSequence,
    health: Health,
    combat: VillagerCombat,
    movement: Box<dyn Movement>,
    animator: Box<dyn Animator>,
    step_accumulator: f32,
}

impl Villager {
    /// Start building a villager.
    pub fn builder(name: impl Into<String>, role: Role) -> VillagerBuilder {
        VillagerBuilder::new(name, role)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Entity ID.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// The villager's power holder in the economy.
    pub const fn holder(&self) -> HolderId {
        self.holder
    }

    /// Supporting building, if any.
    pub const fn building(&self) -> Option<EntityId> {
        self.building
    }

    /// Morale state.
    pub const fn state(&self) -> VillagerState {
        self.state
    }

    /// Faction tag.
    pub const fn faction(&self) -> Faction {
        self.faction
    }

    /// Power, food, discontent and tier.
    pub const fn stats(&self) -> &VillagerStats {
        &self.stats
    }

    /// Current discontent.
    pub const fn discontent(&self) -> f32 {
        self.stats.discontent()
    }

    /// Hit points.
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Combat component.
    pub const fn combat(&self) -> &VillagerCombat {
        &self.combat
    }

    /// Movement collaborator.
    pub fn movement(&self) -> &dyn Movement {
        self.movement.as_ref()
    }

    /// Mutable movement collaborator, for positioning orders.
    pub fn movement_mut(&mut self) -> &mut dyn Movement {
        self.movement.as_mut()
    }

    /// Current position.
    pub fn position(&self) -> Vec2 {
        self.movement.position()
    }

    /// Whether the rebellion telegraph is counting down.
    pub const fn is_rebellion_pending(&self) -> bool {
        self.rebellion.is_pending()
    }

    /// Whether the villager is still on the village's side (Loyal or
    /// Angry, telegraph included).
    pub const fn is_loyal(&self) -> bool {
        !self.state.is_terminal()
    }

    /// Spatial category for the current state.
    pub const fn category(&self) -> EntityCategory {
        EntityCategory::for_villager(self.state)
    }

    /// Read-only view for the UI.
    pub fn snapshot(&self) -> VillagerSnapshot {
        let position = self.position();
        VillagerSnapshot {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
            state: self.state,
            faction: self.faction,
            power: self.stats.power(),
            tier: self.stats.tier(),
            food: self.stats.food(),
            discontent: self.stats.discontent(),
            is_active: self.stats.is_active(),
            health: self.health.current_hp(),
            max_health: self.health.max_hp(),
            efficiency: self.combat.efficiency(),
            rebellion_pending: self.rebellion.is_pending(),
            position: (position.x, position.y),
        }
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    /// Run one frame of `dt` seconds.
    #[allow(clippy::while_float, reason = "each iteration subtracts a positive step")]
    pub fn tick(&mut self, dt: f32, spatial: &dyn SpatialQuery) -> VillagerTick {
        let mut out = VillagerTick::default();
        if self.health.is_dead() {
            return out;
        }
        let dt = dt.max(0.0);

        if self
            .rebellion
            .advance(dt, self.config.discontent.telegraph_seconds)
        {
            self.commit_rebellion(&mut out.events);
            out.rebelled = true;
        }

        if self.stats.is_active() && self.state != VillagerState::Rebel {
            let step = self.config.discontent.step_seconds;
            self.step_accumulator += dt;
            while self.step_accumulator + STEP_EPSILON >= step {
                self.step_accumulator -= step;
                discontent::apply_step(&mut self.stats, &self.config.discontent);
                self.evaluate_state(&mut out.events);
            }
            self.refresh_efficiency();
        }

        let combat = self.combat.tick(CombatFrame {
            dt,
            is_active: self.stats.is_active(),
            position: self.movement.position(),
            spatial,
            movement: self.movement.as_mut(),
            animator: self.animator.as_mut(),
        });
        if let Some(target) = combat.target_changed {
            out.events.push(SimEvent::TargetAcquired {
                villager: self.id,
                target,
            });
        }
        out.effects = combat.effects;

        self.movement.advance(dt, spatial);
        out
    }

    // -----------------------------------------------------------------------
    // Discontent
    // -----------------------------------------------------------------------

    /// Add (or remove) discontent and re-evaluate state.
    ///
    /// Ignored once Rebel.
    pub fn add_discontent(&mut self, amount: f32) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if self.state.is_terminal() {
            return events;
        }
        let applied = self.stats.add_discontent(amount);
        debug!(
            villager = %self.id,
            applied,
            discontent = self.stats.discontent(),
            "Discontent changed"
        );
        self.evaluate_state(&mut events);
        events
    }

    /// Push discontent to the maximum, starting the rebellion telegraph.
    pub fn force_max_discontent(&mut self) -> Vec<SimEvent> {
        self.add_discontent(MAX_DISCONTENT)
    }

    /// Struck by an ally.
    pub fn on_friendly_fire(&mut self, attacker: EntityId) -> Vec<SimEvent> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        let mut events = vec![SimEvent::FriendlyFire {
            victim: self.id,
            attacker,
        }];
        events.extend(self.add_discontent(self.config.discontent.friendly_fire_discontent));
        events
    }

    /// The supporting building fell: the villager goes inactive and
    /// resents it.
    pub fn on_building_destroyed(&mut self) -> Vec<SimEvent> {
        self.set_active(false);
        self.add_discontent(self.config.discontent.building_destroyed_discontent)
    }

    /// Saw the player kill `victim`: rebellion follows regardless of
    /// current discontent.
    pub fn on_witnessed_player_kill(&mut self, victim: EntityId) -> Vec<SimEvent> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        info!(villager = %self.id, victim = %victim, "Witnessed the player kill a villager");
        let mut events = vec![SimEvent::WitnessedPlayerKill {
            witness: self.id,
            victim,
        }];
        events.extend(self.force_max_discontent());
        events
    }

    /// Once-per-night recovery for a fed villager.
    pub fn apply_nightly_recovery(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if self.state.is_terminal() || self.rebellion.is_pending() {
            return events;
        }
        if let Some(recovered) =
            discontent::apply_nightly_recovery(&mut self.stats, &self.config.discontent)
        {
            debug!(villager = %self.id, recovered, "Nightly recovery");
            self.evaluate_state(&mut events);
        }
        events
    }

    /// Nightly discontent from the player's greed. `risk` is in `[0, 1]`.
    pub fn apply_greed_penalty(&mut self, risk: f32) -> Vec<SimEvent> {
        if risk <= 0.0 {
            return Vec::new();
        }
        self.add_discontent(self.config.discontent.greed_discontent_per_night * risk.min(1.0))
    }

    // -----------------------------------------------------------------------
    // Inputs from the village
    // -----------------------------------------------------------------------

    /// Mirror the holder's power, re-deriving tier, stats and max health.
    pub fn set_power(&mut self, power: u32) {
        if let Some(previous) = self.stats.set_power(power) {
            let tier = self.stats.tier();
            self.combat.set_tier(tier);
            let max = self.max_health_for_state();
            self.health.set_max(max);
            debug!(villager = %self.id, ?previous, ?tier, power, "Tier changed");
        }
    }

    /// Give (or take) food. Returns the change applied.
    pub fn feed(&mut self, amount: f32) -> f32 {
        let applied = self.stats.add_food(amount);
        self.refresh_efficiency();
        applied
    }

    /// Mark the supporting structure as standing or fallen.
    pub fn set_active(&mut self, active: bool) {
        if self.stats.is_active() != active {
            self.stats.set_active(active);
            debug!(villager = %self.id, active, "Activity changed");
        }
    }

    /// Apply a captain's bonus bundle. Rebels cannot be influenced.
    pub fn apply_captain_influence(&mut self, captain: EntityId, bonus: InfluenceBonus) -> bool {
        if self.state == VillagerState::Rebel {
            return false;
        }
        let is_new = self.combat.apply_captain_influence(captain, bonus);
        self.movement
            .set_speed_multiplier(self.combat.speed_multiplier());
        is_new
    }

    /// Remove `captain`'s bonus bundle. A no-op for any other captain.
    pub fn remove_captain_influence(&mut self, captain: EntityId) -> bool {
        let removed = self.combat.remove_captain_influence(captain);
        if removed {
            self.movement
                .set_speed_multiplier(self.combat.speed_multiplier());
        }
        removed
    }

    /// Receive a mage buff.
    pub fn apply_mage_buff(&mut self, source: EntityId, factor: f32, duration: f32) {
        self.combat.apply_mage_buff(source, factor, duration);
        self.animator.flash(FlashColor::Gold, HIT_FLASH_SECONDS);
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn max_health_for_state(&self) -> f32 {
        let base = self.config.health.max_health.at(self.stats.tier());
        if self.state == VillagerState::Rebel {
            base * self.config.discontent.rebel_health_multiplier
        } else {
            base
        }
    }

    fn refresh_efficiency(&mut self) {
        let efficiency =
            combat_efficiency(self.stats.food(), self.state, &self.config.efficiency);
        self.combat.set_efficiency(efficiency);
    }

    fn evaluate_state(&mut self, events: &mut Vec<SimEvent>) {
        match discontent::evaluate_state(
            self.stats.discontent(),
            self.state,
            self.rebellion.is_pending(),
            &self.config.discontent,
        ) {
            StateDecision::Unchanged => {}
            StateDecision::Become(state) => self.transition(state, events),
            StateDecision::BeginRebellion => self.begin_rebellion(events),
        }
    }

    fn transition(&mut self, to: VillagerState, events: &mut Vec<SimEvent>) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        self.combat.set_state(to);
        self.refresh_efficiency();
        self.animator.flash(FlashColor::for_state(to), STATE_FLASH_SECONDS);
        debug!(villager = %self.id, %from, %to, "State changed");
        events.push(SimEvent::VillagerStateChanged {
            villager: self.id,
            from,
            to,
        });
    }

    fn begin_rebellion(&mut self, events: &mut Vec<SimEvent>) {
        if !self.rebellion.start() {
            return;
        }
        self.transition(VillagerState::Angry, events);
        let telegraph = self.config.discontent.telegraph_seconds;
        self.animator.flash(FlashColor::Orange, telegraph);
        info!(villager = %self.id, role = %self.role, telegraph, "Rebellion telegraph started");
        events.push(SimEvent::RebellionStarted { villager: self.id });
    }

    fn commit_rebellion(&mut self, events: &mut Vec<SimEvent>) {
        self.transition(VillagerState::Rebel, events);
        self.faction = Faction::Rebels;
        self.combat.set_efficiency(1.0);
        self.health
            .scale(self.config.discontent.rebel_health_multiplier);
        self.movement.set_speed_multiplier(1.0);
        info!(
            villager = %self.id,
            role = %self.role,
            health = self.health.current_hp(),
            "Villager rebelled"
        );
        events.push(SimEvent::VillagerRebelled {
            villager: self.id,
            role: self.role,
        });
    }
}

impl Damageable for Villager {
    /// Damage reduced by captain influence. Returns hit points removed.
    fn take_damage(&mut self, amount: f32, source: Option<EntityId>) -> f32 {
        let scaled = amount * self.combat.incoming_damage_multiplier();
        let dealt = self.health.take_damage(scaled, source);
        if dealt > 0.0 {
            self.animator.flash(FlashColor::Crimson, HIT_FLASH_SECONDS);
        }
        dealt
    }

    fn heal(&mut self, amount: f32) -> f32 {
        self.health.heal(amount)
    }

    fn current_hp(&self) -> f32 {
        self.health.current_hp()
    }

    fn max_hp(&self) -> f32 {
        self.health.max_hp()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`Villager`] with every sub-system for its role.
///
/// Unset collaborators get the headless defaults: a
/// [`StraightLineMover`], a [`TracingAnimator`], and the role's standard
/// damage dealer.
#[derive(Debug)]
pub struct VillagerBuilder {
    id: Option<EntityId>,
    name: String,
    role: Role,
    holder: Option<HolderId>,
    building: Option<EntityId>,
    position: Vec2,
    config: Option<Arc<VillagerConfig>>,
    movement: Option<Box<dyn Movement>>,
    animator: Option<Box<dyn Animator>>,
    dealer: Option<Box<dyn AttackExecution>>,
    without_dealer: bool,
    power: u32,
    food: f32,
    discontent: f32,
}

impl VillagerBuilder {
    /// A builder for a villager called `name` with `role`.
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            id: None,
            name: name.into(),
            role,
            holder: None,
            building: None,
            position: Vec2::ZERO,
            config: None,
            movement: None,
            animator: None,
            dealer: None,
            without_dealer: false,
            power: 0,
            food: 1.0,
            discontent: 0.0,
        }
    }

    /// Use a fixed entity ID instead of a fresh one.
    #[must_use]
    pub const fn id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// The villager's power holder. Required.
    #[must_use]
    pub const fn holder(mut self, holder: HolderId) -> Self {
        self.holder = Some(holder);
        self
    }

    /// Supporting building.
    #[must_use]
    pub const fn building(mut self, building: EntityId) -> Self {
        self.building = Some(building);
        self
    }

    /// Starting position for the default mover.
    #[must_use]
    pub const fn position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Shared tuning. Defaults to [`VillagerConfig::default`].
    #[must_use]
    pub fn config(mut self, config: Arc<VillagerConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Custom movement collaborator.
    #[must_use]
    pub fn movement(mut self, movement: Box<dyn Movement>) -> Self {
        self.movement = Some(movement);
        self
    }

    /// Custom animation collaborator.
    #[must_use]
    pub fn animator(mut self, animator: Box<dyn Animator>) -> Self {
        self.animator = Some(animator);
        self
    }

    /// Custom damage dealer.
    #[must_use]
    pub fn dealer(mut self, dealer: Box<dyn AttackExecution>) -> Self {
        self.dealer = Some(dealer);
        self.without_dealer = false;
        self
    }

    /// Build without a damage dealer. The villager exists and moves but
    /// never deals damage.
    #[must_use]
    pub fn without_dealer(mut self) -> Self {
        self.dealer = None;
        self.without_dealer = true;
        self
    }

    /// Starting power.
    #[must_use]
    pub const fn power(mut self, power: u32) -> Self {
        self.power = power;
        self
    }

    /// Starting food.
    #[must_use]
    pub const fn food(mut self, food: f32) -> Self {
        self.food = food;
        self
    }

    /// Starting discontent.
    #[must_use]
    pub const fn discontent(mut self, discontent: f32) -> Self {
        self.discontent = discontent;
        self
    }

    /// Assemble the villager.
    ///
    /// # Errors
    ///
    /// Returns [`VillagerError::MissingField`] when no holder was given or
    /// the name is empty.
    pub fn build(self) -> Result<Villager, VillagerError> {
        let holder = self.holder.ok_or(VillagerError::MissingField("holder"))?;
        if self.name.trim().is_empty() {
            return Err(VillagerError::MissingField("name"));
        }

        let id = self.id.unwrap_or_else(EntityId::new);
        let config = self.config.unwrap_or_default();
        let dealer = if self.without_dealer {
            None
        } else {
            self.dealer
                .or_else(|| dealer_for_role(self.role, &config.combat))
        };
        let movement = self.movement.unwrap_or_else(|| {
            Box::new(StraightLineMover::new(self.position, config.combat.move_speed))
        });
        let animator = self
            .animator
            .unwrap_or_else(|| Box::new(TracingAnimator::new(id)));
        let combat = VillagerCombat::new(id, self.role, Arc::clone(&config), dealer);
        let health = Health::new(config.health.max_health.base);

        let mut villager = Villager {
            id,
            name: self.name,
            role: self.role,
            holder,
            building: self.building,
            config,
            stats: VillagerStats::default(),
            state: VillagerState::Loyal,
            faction: Faction::Village,
            rebellion: RebellionSequence::new(),
            health,
            combat,
            movement,
            animator,
            step_accumulator: 0.0,
        };
        villager.set_power(self.power);
        villager.stats.add_food(self.food - 1.0);
        villager.stats.add_discontent(self.discontent);
        let mut discarded = Vec::new();
        villager.evaluate_state(&mut discarded);
        villager.refresh_efficiency();

        debug!(
            villager = %villager.id,
            name = %villager.name,
            role = %villager.role,
            tier = ?villager.stats.tier(),
            "Villager built"
        );
        Ok(villager)
    }
}
