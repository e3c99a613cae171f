//! The frame tick: one call to [`Simulation::tick`] advances the whole
//! village by `dt` seconds.
//!
//! Each frame runs through these phases:
//!
//! 1. **Clock** -- advance time. Crossing into night runs the nightly
//!    cycle: power generation, food distribution, recovery, then the
//!    greed penalty.
//!
//! 2. **Snapshot** -- build the spatial index every entity queries this
//!    frame. Positions are those at the start of the frame.
//!
//! 3. **Villagers** -- tick every villager in ID order. A committed
//!    rebellion is handed to the [`VillageManager`] immediately, so its
//!    cascade is published before the next villager runs.
//!
//! 4. **Influence** -- captains re-derive their auras and honor guards.
//!
//! 5. **World** -- raiders chase and strike, the player strikes and picks
//!    up drops.
//!
//! 6. **Resolution** -- apply every combat effect in production order.
//!    Effects whose source or target died earlier in the frame are
//!    dropped. Deaths, friendly fire, witnessed kills and fallen
//!    buildings are resolved here.
//!
//! 7. **Upkeep** -- age drops and mirror holder power into villager tiers.
//!
//! The frame is deterministic for a given configuration, roster and
//! sequence of `dt` values.

use std::sync::Arc;

use glam::Vec2;
use hearthguard_power::{PowerEconomy, PowerError, PowerHolder};
use hearthguard_types::{EntityCategory, EntityId, HolderId, Role, SimEvent, VillageSnapshot};
use hearthguard_villagers::{
    CombatEffect, Damageable, SpatialIndex, Villager, VillagerConfig, VillagerError,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::bus::{EventBus, EventListener, RecordedEvent};
use crate::clock::{ClockError, SimulationClock};
use crate::config::{ConfigError, SimulationConfig};
use crate::manager::VillageManager;
use crate::world::{Building, Player, Raider, World};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The configuration is invalid.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A power operation failed.
    #[error("power error: {source}")]
    Power {
        /// The underlying power error.
        #[from]
        source: PowerError,
    },

    /// A villager could not be built or added.
    #[error("villager error: {source}")]
    Villager {
        /// The underlying villager error.
        #[from]
        source: VillagerError,
    },

    /// No villager, raider, building or player has this ID.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// No building has this ID.
    #[error("building not found: {0}")]
    BuildingNotFound(EntityId),
}

/// Summary of a completed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary {
    /// The frame that just ran.
    pub frame: u64,
    /// Simulated seconds since the start.
    pub elapsed_seconds: f64,
    /// Current day.
    pub day: u32,
    /// Whether it is night.
    pub is_night: bool,
    /// Villagers on the roster.
    pub villagers: u32,
    /// Villagers that have not rebelled.
    pub loyal: u32,
    /// Committed rebels.
    pub rebels: u32,
    /// Living raiders.
    pub raiders: u32,
    /// Whether the player is alive.
    pub player_alive: bool,
    /// Power in the communal pool.
    pub communal_power: u32,
    /// Events published during the frame.
    pub event_count: u32,
}

/// A keybound power shortcut, applied through the public economy API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    /// Move power from the communal pool to the player.
    TakeFromCommunal(u32),
    /// Move power from the player back to the communal pool.
    ReturnToCommunal(u32),
    /// Move power from the communal pool to a villager.
    Allocate {
        /// The villager.
        villager: EntityId,
        /// Power requested.
        amount: u32,
    },
    /// Move power from a villager back to the communal pool.
    Reclaim {
        /// The villager.
        villager: EntityId,
        /// Power requested.
        amount: u32,
    },
    /// Spread the communal pool evenly across villagers.
    AutoDistribute,
}

/// A villager to add to the roster.
#[derive(Debug, Clone, PartialEq)]
pub struct Recruit {
    /// Display name.
    pub name: String,
    /// Fixed role.
    pub role: Role,
    /// Starting position.
    pub position: Vec2,
    /// Supporting building, if any.
    pub building: Option<EntityId>,
    /// Starting food in `[0, 1]`.
    pub food: f32,
    /// Starting discontent in `[0, 100]`.
    pub discontent: f32,
}

impl Recruit {
    /// A fed, content villager at `position`.
    pub fn new(name: impl Into<String>, role: Role, position: Vec2) -> Self {
        Self {
            name: name.into(),
            role,
            position,
            building: None,
            food: 1.0,
            discontent: 0.0,
        }
    }

    /// Housed in `building`.
    #[must_use]
    pub const fn housed_in(mut self, building: EntityId) -> Self {
        self.building = Some(building);
        self
    }

    /// Starting discontent.
    #[must_use]
    pub const fn with_discontent(mut self, discontent: f32) -> Self {
        self.discontent = discontent;
        self
    }

    /// Starting food.
    #[must_use]
    pub const fn with_food(mut self, food: f32) -> Self {
        self.food = food;
        self
    }
}

/// The complete simulation context.
///
/// Owns every subsystem; nothing is global, so independent simulations
/// can run side by side.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    villager_config: Arc<VillagerConfig>,
    clock: SimulationClock,
    economy: PowerEconomy,
    village: VillageManager,
    world: World,
    bus: EventBus,
    player_dead: bool,
}

impl Simulation {
    /// Validate `config` and build an empty village with the player at the
    /// origin.
    pub fn new(config: SimulationConfig) -> Result<Self, TickError> {
        config.validate()?;
        let villager_config = Arc::new(config.villager_config());
        let clock = SimulationClock::new(&config.clock)?;
        let mut economy = PowerEconomy::new(config.power.clone());
        let holder = economy.register_player(config.player.name.clone())?;
        let player = Player::new(holder, Vec2::ZERO, config.player.clone());
        let village = VillageManager::new(
            config.cascade.clone(),
            config.food.clone(),
            config.influence.clone(),
        );

        info!(
            world = %config.world.name,
            communal_power = economy.communal_power(),
            "Simulation created"
        );

        Ok(Self {
            config,
            villager_config,
            clock,
            economy,
            village,
            world: World::new(player),
            bus: EventBus::new(),
            player_dead: false,
        })
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Add a standing building.
    pub fn add_building(&mut self, name: impl Into<String>, position: Vec2) -> EntityId {
        let building = Building::new(name, position, self.config.world.building_max_health);
        let id = self.world.add_building(building);
        debug!(building = %id, "Building added");
        id
    }

    /// Register a power holder for `recruit` and add it to the roster.
    pub fn recruit(&mut self, recruit: Recruit) -> Result<EntityId, TickError> {
        if let Some(building) = recruit.building
            && self.world.building(building).is_none()
        {
            return Err(TickError::BuildingNotFound(building));
        }

        let holder = self.economy.register_villager(recruit.name.clone());
        let mut builder = Villager::builder(recruit.name, recruit.role)
            .holder(holder)
            .position(recruit.position)
            .config(Arc::clone(&self.villager_config))
            .food(recruit.food)
            .discontent(recruit.discontent);
        if let Some(building) = recruit.building {
            builder = builder.building(building);
        }

        let added = builder
            .build()
            .and_then(|villager| self.village.add_villager(villager));
        match added {
            Ok(id) => Ok(id),
            Err(err) => {
                self.economy.remove_holder(holder)?;
                Err(err.into())
            }
        }
    }

    /// Spawn a raider at `position`.
    pub fn spawn_raider(&mut self, position: Vec2) -> EntityId {
        let id = self
            .world
            .add_raider(Raider::new(position, &self.config.raiders));
        info!(raider = %id, x = position.x, y = position.y, "Raider spawned");
        self.emit([SimEvent::RaiderSpawned { raider: id }]);
        id
    }

    /// Move the player.
    pub const fn move_player(&mut self, position: Vec2) {
        self.world.player_mut().set_position(position);
    }

    /// Register a synchronous event listener.
    pub fn register_listener(&mut self, listener: Box<dyn EventListener>) {
        self.bus.register(listener);
    }

    /// Subscribe to the broadcast event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordedEvent> {
        self.bus.subscribe()
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> Result<FrameSummary, TickError> {
        let dt = dt.max(0.0);
        self.bus.begin_frame();

        // Clock and nightly cycle.
        let crossed = self.clock.advance(dt)?;
        for event in crossed {
            let nightfall = matches!(event, SimEvent::NightBegan { .. });
            self.emit([event]);
            if nightfall {
                self.run_nightfall();
            }
        }

        let spatial = self.spatial_snapshot();
        let mut effects: Vec<CombatEffect> = Vec::new();

        // Villagers.
        for id in self.village.ids() {
            let Some(villager) = self.village.get_mut(id) else {
                continue;
            };
            let outcome = villager.tick(dt, &spatial);
            self.emit(outcome.events);
            effects.extend(outcome.effects);
            if outcome.rebelled {
                let cascade = self.village.on_villager_rebelled(id);
                self.emit(cascade);
            }
        }

        // Influence.
        let influence = self.village.tick_influence(dt);
        self.emit(influence);

        // Raiders, then the player.
        for id in self.world.raider_ids() {
            if let Some(raider) = self.world.raider_mut(id)
                && let Some(effect) = raider.tick(dt, &spatial, &self.config.raiders)
            {
                effects.push(effect);
            }
        }
        if !self.player_dead {
            if let Some(effect) = self.world.player_mut().tick(dt, &spatial) {
                effects.push(effect);
            }
            self.collect_drops()?;
        }

        // Resolution.
        for effect in effects {
            self.apply_effect(effect)?;
        }

        // Upkeep.
        for (drop, amount) in self.economy.expire_drops(dt) {
            self.world.clear_drop(drop);
            debug!(drop = %drop, amount, "Drop returned to the communal pool");
        }
        self.village.sync_power(&self.economy);

        let summary = self.summary();
        debug!(
            frame = summary.frame,
            loyal = summary.loyal,
            rebels = summary.rebels,
            raiders = summary.raiders,
            events = summary.event_count,
            "Frame complete"
        );
        Ok(summary)
    }

    fn run_nightfall(&mut self) {
        let generation = self.config.power.nightly_generation;
        if generation > 0 {
            match self.economy.generate(generation) {
                Ok(generated) => debug!(generated, "Nightly power generated"),
                Err(err) => warn!(error = %err, "Nightly power generation failed"),
            }
        }

        if let Some(event) = self.village.distribute_food() {
            self.emit([event]);
        }
        let recovery = self.village.apply_nightly_recovery();
        self.emit(recovery);
        let greed = self.village.apply_greed_penalty(&self.economy);
        self.emit(greed);

        if !self.economy.verify_conservation().is_balanced() {
            warn!(day = self.clock.day(), "Power ledger out of balance at nightfall");
        }
    }

    fn spatial_snapshot(&self) -> SpatialIndex {
        let mut spatial = SpatialIndex::new();
        for villager in self.village.villagers().filter(|v| !v.is_dead()) {
            spatial.insert(villager.id(), villager.category(), villager.position());
        }
        for raider in self.world.raiders().filter(|r| !r.health().is_dead()) {
            spatial.insert(raider.id(), EntityCategory::Hostile, raider.position());
        }
        let player = self.world.player();
        if !self.player_dead {
            spatial.insert(player.id(), EntityCategory::Player, player.position());
        }
        for building in self.world.buildings().filter(|b| !b.is_destroyed()) {
            spatial.insert(building.id(), EntityCategory::Building, building.position());
        }
        spatial
    }

    fn collect_drops(&mut self) -> Result<(), TickError> {
        let holder = self.world.player().holder();
        for drop in self.world.drops_in_pickup_range() {
            match self.economy.collect_drop(drop, holder) {
                Ok(amount) => {
                    if self.economy.drop_site(drop).is_none() {
                        self.world.clear_drop(drop);
                    }
                    self.emit([SimEvent::PowerCollected { drop, amount }]);
                }
                Err(PowerError::HolderFull { .. }) => break,
                Err(PowerError::UnknownDrop(_)) => {
                    self.world.clear_drop(drop);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Effects and damage
    // -----------------------------------------------------------------------

    fn apply_effect(&mut self, effect: CombatEffect) -> Result<(), TickError> {
        match effect {
            CombatEffect::Damage {
                source,
                target,
                amount,
            } => {
                if !self.is_alive(source) {
                    return Ok(());
                }
                match self.damage_entity(Some(source), target, amount) {
                    Ok(_) | Err(TickError::UnknownEntity(_)) => Ok(()),
                    Err(err) => Err(err),
                }
            }
            CombatEffect::Buff {
                source,
                target,
                factor,
                duration,
            } => {
                if let Some(villager) = self.village.get_mut(target)
                    && !villager.is_dead()
                {
                    villager.apply_mage_buff(source, factor, duration);
                }
                Ok(())
            }
            CombatEffect::Heal { target, amount, .. } => {
                if let Some(villager) = self.village.get_mut(target) {
                    villager.heal(amount);
                } else if target == self.world.player().id() && !self.player_dead {
                    self.world.player_mut().heal(amount);
                }
                Ok(())
            }
        }
    }

    fn is_alive(&self, id: EntityId) -> bool {
        if let Some(villager) = self.village.get(id) {
            return !villager.is_dead();
        }
        if let Some(raider) = self.world.raider(id) {
            return !raider.health().is_dead();
        }
        id == self.world.player().id() && !self.player_dead
    }

    /// Hurt any entity, resolving friendly fire, deaths and witnessed
    /// kills. Returns the hit points removed.
    pub fn damage_entity(
        &mut self,
        source: Option<EntityId>,
        target: EntityId,
        amount: f32,
    ) -> Result<f32, TickError> {
        if self.village.get(target).is_some() {
            return self.damage_villager(source, target, amount);
        }

        match self.world.category_of(target) {
            Some(EntityCategory::Player) => {
                if self.player_dead {
                    return Ok(0.0);
                }
                let dealt = self.world.player_mut().take_damage(amount, source);
                if self.world.player().health().is_dead() {
                    self.player_dead = true;
                    warn!(killer = ?source, "Player died");
                    self.emit([SimEvent::PlayerDied]);
                }
                Ok(dealt)
            }
            Some(EntityCategory::Hostile) => {
                let Some(raider) = self.world.raider_mut(target) else {
                    return Err(TickError::UnknownEntity(target));
                };
                let dealt = raider.take_damage(amount, source);
                if raider.health().is_dead() {
                    self.world.remove_raider(target);
                    info!(raider = %target, killer = ?source, "Raider died");
                    self.emit([SimEvent::RaiderDied {
                        raider: target,
                        killer: source,
                    }]);
                }
                Ok(dealt)
            }
            Some(EntityCategory::Building) => {
                let Some(building) = self.world.building(target) else {
                    return Err(TickError::BuildingNotFound(target));
                };
                let before = building.health().current_hp();
                self.hit_building(target, amount, source)?;
                let after = self
                    .world
                    .building(target)
                    .map_or(before, |b| b.health().current_hp());
                Ok(before - after)
            }
            Some(EntityCategory::LoyalVillager | EntityCategory::RebelVillager) | None => {
                Err(TickError::UnknownEntity(target))
            }
        }
    }

    fn damage_villager(
        &mut self,
        source: Option<EntityId>,
        target: EntityId,
        amount: f32,
    ) -> Result<f32, TickError> {
        let friendly = source.is_some_and(|s| s != target && self.is_loyal_side(s));
        let player_id = self.world.player().id();

        let Some(villager) = self.village.get_mut(target) else {
            return Err(TickError::UnknownEntity(target));
        };
        if villager.is_dead() {
            return Ok(0.0);
        }
        let was_loyal = villager.is_loyal();
        let dealt = villager.take_damage(amount, source);

        if villager.is_dead() {
            let position = self.handle_villager_death(target, source)?;
            if was_loyal
                && source == Some(player_id)
                && let Some(position) = position
            {
                self.witness_player_kill(target, position);
            }
            return Ok(dealt);
        }

        if friendly
            && was_loyal
            && let Some(attacker) = source
        {
            let events = villager.on_friendly_fire(attacker);
            self.emit(events);
        }
        Ok(dealt)
    }

    fn is_loyal_side(&self, id: EntityId) -> bool {
        if id == self.world.player().id() {
            return true;
        }
        self.village.get(id).is_some_and(Villager::is_loyal)
    }

    /// Remove a dead villager, drop its power and share out its food.
    /// Returns where it died.
    fn handle_villager_death(
        &mut self,
        id: EntityId,
        killer: Option<EntityId>,
    ) -> Result<Option<Vec2>, TickError> {
        let Some(villager) = self.village.remove_villager(id) else {
            return Ok(None);
        };
        let position = villager.position();
        let holder = villager.holder();
        let freed_food = villager.stats().food();

        let dropped = self.economy.drop_power(holder)?;
        self.economy.remove_holder(holder)?;
        let dropped_power = dropped.map_or(0, |(_, amount)| amount);

        info!(
            villager = %id,
            role = ?villager.role(),
            killer = ?killer,
            dropped_power,
            "Villager died"
        );
        self.emit([SimEvent::VillagerDied {
            villager: id,
            role: villager.role(),
            killer,
            dropped_power,
        }]);

        if let Some((drop, amount)) = dropped {
            self.world.place_drop(drop, position);
            self.emit([SimEvent::PowerDropped {
                drop,
                villager: id,
                amount,
            }]);
        }

        if let Some(event) = self.village.redistribute_after_death(freed_food) {
            self.emit([event]);
        }
        Ok(Some(position))
    }

    fn witness_player_kill(&mut self, victim: EntityId, position: Vec2) {
        let radius = self.villager_config.discontent.witness_radius;
        for witness in self.village.loyal_within(position, radius) {
            let Some(villager) = self.village.get_mut(witness) else {
                continue;
            };
            let events = villager.on_witnessed_player_kill(victim);
            self.emit(events);
        }
    }

    /// Damage a building. Returns `true` on the hit that destroys it.
    pub fn damage_building(&mut self, building: EntityId, amount: f32) -> Result<bool, TickError> {
        self.hit_building(building, amount, None)
    }

    fn hit_building(
        &mut self,
        id: EntityId,
        amount: f32,
        source: Option<EntityId>,
    ) -> Result<bool, TickError> {
        let building = self
            .world
            .building_mut(id)
            .ok_or(TickError::BuildingNotFound(id))?;
        if !building.damage(amount, source) {
            return Ok(false);
        }

        let (displaced, events) = self.village.on_building_destroyed(id);
        info!(building = %id, displaced = displaced.len(), "Building destroyed");
        self.emit([SimEvent::BuildingDestroyed {
            building: id,
            displaced,
        }]);
        self.emit(events);
        Ok(true)
    }

    /// Order the player to strike `target`. Returns `Ok(false)` when the
    /// player is cooling down, dead, or out of reach.
    pub fn player_strike(&mut self, target: EntityId) -> Result<bool, TickError> {
        if self.player_dead {
            return Ok(false);
        }
        let spatial = self.spatial_snapshot();
        let Some(effect) = self.world.player_mut().try_strike(target, &spatial) else {
            return Ok(false);
        };
        self.apply_effect(effect)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Discontent and power
    // -----------------------------------------------------------------------

    /// Add discontent to one villager.
    pub fn add_discontent(&mut self, villager: EntityId, amount: f32) -> Result<(), TickError> {
        let target = self
            .village
            .get_mut(villager)
            .ok_or(TickError::UnknownEntity(villager))?;
        let events = target.add_discontent(amount);
        self.emit(events);
        Ok(())
    }

    /// Push one villager straight to maximum discontent.
    pub fn force_max_discontent(&mut self, villager: EntityId) -> Result<(), TickError> {
        let target = self
            .village
            .get_mut(villager)
            .ok_or(TickError::UnknownEntity(villager))?;
        let events = target.force_max_discontent();
        self.emit(events);
        Ok(())
    }

    /// Apply a power shortcut. Returns the amount of power moved.
    pub fn apply_power_command(&mut self, command: PowerCommand) -> Result<u32, TickError> {
        let moved = match command {
            PowerCommand::TakeFromCommunal(amount) => {
                self.economy.transfer_power_to_player(amount)?
            }
            PowerCommand::ReturnToCommunal(amount) => {
                self.economy.return_power_to_communal(amount)?
            }
            PowerCommand::Allocate { villager, amount } => {
                let holder = self.holder_of(villager)?;
                self.economy.allocate_to_holder(holder, amount)?
            }
            PowerCommand::Reclaim { villager, amount } => {
                let holder = self.holder_of(villager)?;
                self.economy.reclaim_from_holder(holder, amount)?
            }
            PowerCommand::AutoDistribute => self
                .economy
                .auto_distribute()
                .values()
                .fold(0_u32, |total, moved| total.saturating_add(*moved)),
        };
        self.village.sync_power(&self.economy);
        debug!(?command, moved, "Power command applied");
        Ok(moved)
    }

    fn holder_of(&self, villager: EntityId) -> Result<HolderId, TickError> {
        self.village
            .get(villager)
            .map(Villager::holder)
            .ok_or(TickError::UnknownEntity(villager))
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    /// Summary of the current state.
    pub fn summary(&self) -> FrameSummary {
        FrameSummary {
            frame: self.clock.frame(),
            elapsed_seconds: self.clock.elapsed_seconds(),
            day: self.clock.day(),
            is_night: self.clock.is_night(),
            villagers: count(self.village.len()),
            loyal: count(self.village.loyal_count()),
            rebels: count(self.village.rebel_count()),
            raiders: count(self.world.raiders_alive()),
            player_alive: !self.player_dead,
            communal_power: self.economy.communal_power(),
            event_count: count(self.bus.frame_events().len()),
        }
    }

    /// Serializable copy of the village for the UI.
    pub fn snapshot(&self) -> VillageSnapshot {
        VillageSnapshot {
            frame: self.clock.frame(),
            elapsed_seconds: self.clock.elapsed_seconds(),
            day: self.clock.day(),
            is_night: self.clock.is_night(),
            villagers: self.village.villagers().map(Villager::snapshot).collect(),
            economy: self.economy.snapshot(),
            player_health: self.world.player().health().current_hp(),
            raiders_alive: count(self.world.raiders_alive()),
        }
    }

    /// Events published during the most recent frame.
    pub fn events(&self) -> &[SimEvent] {
        self.bus.frame_events()
    }

    /// Recent events across frames.
    pub fn history(&self) -> &[RecordedEvent] {
        self.bus.history()
    }

    /// The configuration in use.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The clock.
    pub const fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// The power economy.
    pub const fn economy(&self) -> &PowerEconomy {
        &self.economy
    }

    /// The village roster.
    pub const fn village(&self) -> &VillageManager {
        &self.village
    }

    /// The player, raiders and buildings.
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Power currently held by the player.
    pub fn player_power(&self) -> u32 {
        self.economy.player().map_or(0, PowerHolder::current)
    }

    /// Whether the player has died.
    pub const fn is_player_dead(&self) -> bool {
        self.player_dead
    }

    fn emit(&mut self, events: impl IntoIterator<Item = SimEvent>) {
        let frame = self.clock.frame();
        self.bus.publish_all(frame, events);
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearthguard_types::VillagerState;

    use super::*;
    use crate::config::ClockConfig;

    fn simulation() -> Simulation {
        Simulation::new(SimulationConfig::default()).unwrap()
    }

    fn short_days() -> Simulation {
        let config = SimulationConfig {
            clock: ClockConfig {
                day_length_seconds: 10.0,
                night_fraction: 0.5,
            },
            ..SimulationConfig::default()
        };
        Simulation::new(config).unwrap()
    }

    fn kinds(sim: &Simulation) -> Vec<&'static str> {
        sim.events().iter().map(SimEvent::kind).collect()
    }

    #[test]
    fn new_registers_the_player_pool() {
        let sim = simulation();
        assert!(sim.economy().player().is_some());
        assert_eq!(sim.economy().communal_power(), 10);
        assert_eq!(sim.summary().villagers, 0);
        assert!(sim.summary().player_alive);
    }

    #[test]
    fn recruit_rejects_unknown_building() {
        let mut sim = simulation();
        let missing = EntityId::new();
        let result =
            sim.recruit(Recruit::new("Ada", Role::Farmer, Vec2::ZERO).housed_in(missing));
        assert!(matches!(result, Err(TickError::BuildingNotFound(id)) if id == missing));
        assert_eq!(sim.economy().holders().count(), 1);
    }

    #[test]
    fn nightfall_generates_power_and_feeds_the_village() {
        let mut sim = short_days();
        sim.recruit(Recruit::new("Ada", Role::Farmer, Vec2::new(30.0, 0.0)).with_food(0.2))
            .unwrap();
        sim.tick(5.0).unwrap();

        let events = kinds(&sim);
        let night = events.iter().position(|k| *k == "night_began");
        let food = events.iter().position(|k| *k == "food_distributed");
        assert!(night.is_some() && food.is_some());
        assert!(night < food);
        assert_eq!(sim.economy().communal_power(), 12);
    }

    #[test]
    fn allocating_power_raises_tier() {
        let mut sim = simulation();
        let id = sim
            .recruit(Recruit::new("Bo", Role::Commoner, Vec2::new(30.0, 0.0)))
            .unwrap();
        let moved = sim
            .apply_power_command(PowerCommand::Allocate {
                villager: id,
                amount: 4,
            })
            .unwrap();
        assert_eq!(moved, 4);
        let villager = sim.village().get(id).unwrap();
        assert_eq!(villager.stats().power(), 4);
        assert_eq!(villager.stats().tier().level(), 2);
        assert_eq!(sim.economy().communal_power(), 6);
    }

    #[test]
    fn take_from_communal_is_clamped() {
        let mut sim = simulation();
        let moved = sim
            .apply_power_command(PowerCommand::TakeFromCommunal(25))
            .unwrap();
        assert_eq!(moved, 10);
        assert_eq!(sim.player_power(), 10);
        assert_eq!(sim.economy().communal_power(), 0);
    }

    #[test]
    fn unknown_villager_power_command_fails() {
        let mut sim = simulation();
        let result = sim.apply_power_command(PowerCommand::Allocate {
            villager: EntityId::new(),
            amount: 1,
        });
        assert!(matches!(result, Err(TickError::UnknownEntity(_))));
    }

    #[test]
    fn friendly_fire_from_the_player_angers_the_victim() {
        let mut sim = simulation();
        let id = sim
            .recruit(Recruit::new("Cy", Role::Commoner, Vec2::new(1.0, 0.0)))
            .unwrap();
        assert!(sim.player_strike(id).unwrap());

        let villager = sim.village().get(id).unwrap();
        assert!(villager.discontent() > 0.0);
        assert!(
            sim.history()
                .iter()
                .any(|r| matches!(r.event, SimEvent::FriendlyFire { victim, .. } if victim == id))
        );
        // Cooling down.
        assert!(!sim.player_strike(id).unwrap());
    }

    #[test]
    fn player_kill_is_witnessed_by_nearby_loyal_villagers() {
        let mut sim = simulation();
        let victim = sim
            .recruit(Recruit::new("Dee", Role::Commoner, Vec2::new(20.0, 0.0)))
            .unwrap();
        let near = sim
            .recruit(Recruit::new("Eli", Role::Commoner, Vec2::new(23.0, 0.0)))
            .unwrap();
        let far = sim
            .recruit(Recruit::new("Fay", Role::Commoner, Vec2::new(60.0, 0.0)))
            .unwrap();
        let player = sim.world().player().id();

        sim.damage_entity(Some(player), victim, 1_000.0).unwrap();

        assert!(sim.village().get(victim).is_none());
        assert!(sim.village().get(near).unwrap().is_rebellion_pending());
        assert!(!sim.village().get(far).unwrap().is_rebellion_pending());
        assert!(sim.history().iter().any(|r| matches!(
            r.event,
            SimEvent::WitnessedPlayerKill { witness, victim: v } if witness == near && v == victim
        )));
    }

    #[test]
    fn raider_kills_are_not_witnessed() {
        let mut sim = simulation();
        let victim = sim
            .recruit(Recruit::new("Gil", Role::Commoner, Vec2::new(20.0, 0.0)))
            .unwrap();
        let near = sim
            .recruit(Recruit::new("Hal", Role::Commoner, Vec2::new(21.0, 0.0)))
            .unwrap();
        let raider = sim.spawn_raider(Vec2::new(19.0, 0.0));

        sim.damage_entity(Some(raider), victim, 1_000.0).unwrap();
        assert!(!sim.village().get(near).unwrap().is_rebellion_pending());
    }

    #[test]
    fn dropped_power_is_collected_by_the_player() {
        let mut sim = simulation();
        let id = sim
            .recruit(Recruit::new("Ida", Role::Commoner, Vec2::new(1.0, 0.0)))
            .unwrap();
        sim.apply_power_command(PowerCommand::Allocate {
            villager: id,
            amount: 3,
        })
        .unwrap();

        sim.damage_entity(None, id, 1_000.0).unwrap();
        assert_eq!(sim.economy().dropped_power(), 3);
        assert!(sim.events().iter().any(|e| matches!(
            e,
            SimEvent::VillagerDied { dropped_power: 3, killer: None, .. }
        )));

        sim.tick(0.1).unwrap();
        assert!(kinds(&sim).contains(&"power_collected"));
        assert_eq!(sim.player_power(), 3);
        assert_eq!(sim.economy().dropped_power(), 0);
        assert!(sim.economy().verify_conservation().is_balanced());
    }

    #[test]
    fn destroyed_building_displaces_residents() {
        let mut sim = simulation();
        let hall = sim.add_building("Hall", Vec2::new(40.0, 0.0));
        let resident = sim
            .recruit(Recruit::new("Jo", Role::Builder, Vec2::new(40.0, 1.0)).housed_in(hall))
            .unwrap();

        assert!(!sim.damage_building(hall, 10.0).unwrap());
        assert!(sim.damage_building(hall, 1_000.0).unwrap());
        assert!(!sim.damage_building(hall, 10.0).unwrap());

        let villager = sim.village().get(resident).unwrap();
        assert!(!villager.stats().is_active());
        assert!(villager.discontent() >= 20.0);
        assert!(sim.history().iter().any(|r| matches!(
            &r.event,
            SimEvent::BuildingDestroyed { building, displaced } if *building == hall && displaced == &vec![resident]
        )));
    }

    #[test]
    fn player_auto_strikes_raiders_until_they_die() {
        let mut sim = simulation();
        let raider = sim.spawn_raider(Vec2::new(1.0, 0.0));
        for _ in 0..600 {
            sim.tick(0.1).unwrap();
            if sim.world().raider(raider).is_none() {
                break;
            }
        }
        assert!(sim.world().raider(raider).is_none());
        assert!(sim.history().iter().any(
            |r| matches!(r.event, SimEvent::RaiderDied { raider: id, .. } if id == raider)
        ));
    }

    #[test]
    fn forced_rebellion_commits_within_a_frame_loop() {
        let mut sim = simulation();
        let id = sim
            .recruit(Recruit::new("Kit", Role::Commoner, Vec2::new(50.0, 0.0)))
            .unwrap();
        sim.force_max_discontent(id).unwrap();
        for _ in 0..12 {
            sim.tick(0.1).unwrap();
        }
        assert_eq!(sim.village().get(id).unwrap().state(), VillagerState::Rebel);
        assert_eq!(sim.summary().rebels, 1);
    }

    #[test]
    fn snapshot_serializes() {
        let mut sim = simulation();
        sim.recruit(Recruit::new("Lu", Role::Mage, Vec2::new(5.0, 5.0)))
            .unwrap();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.villagers.len(), 1);
        assert_eq!(snapshot.economy.communal_power, 10);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"communal_power\":10"));
    }
}
