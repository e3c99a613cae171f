//! Everything on the map that is not a villager.
//!
//! - [`Player`] -- owns the player's power holder; auto-strikes the
//!   nearest raider or rebel in reach and collects power drops.
//! - [`Raider`] -- a hostile that chases the nearest loyal villager, the
//!   player or a building, and strikes on a cooldown.
//! - [`Building`] -- supports its residents until it falls.
//! - [`World`] -- holds the above plus the positions of power drops.
//!
//! Like villagers, these never mutate each other. Strikes come back as
//! [`CombatEffect`]s for the frame tick to apply.

use std::collections::BTreeMap;

use glam::Vec2;
use hearthguard_types::{DropId, EntityCategory, EntityId, HolderId};
use hearthguard_villagers::{
    CombatEffect, Damageable, Health, Movement, SpatialQuery, StraightLineMover,
};
use tracing::debug;

use crate::config::{PlayerConfig, RaiderConfig};

/// What raiders go after.
const RAIDER_TARGETS: [EntityCategory; 3] = [
    EntityCategory::LoyalVillager,
    EntityCategory::Player,
    EntityCategory::Building,
];

/// What the player strikes on its own.
const PLAYER_TARGETS: [EntityCategory; 2] =
    [EntityCategory::Hostile, EntityCategory::RebelVillager];

/// Fraction of attack range at which a chasing raider stops.
const CHASE_STOP_FRACTION: f32 = 0.9;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// The player character.
#[derive(Debug, Clone)]
pub struct Player {
    id: EntityId,
    holder: HolderId,
    position: Vec2,
    health: Health,
    config: PlayerConfig,
    since_last_strike: f32,
}

impl Player {
    /// A player at `position` whose power lives in `holder`.
    pub fn new(holder: HolderId, position: Vec2, config: PlayerConfig) -> Self {
        Self {
            id: EntityId::new(),
            holder,
            position,
            health: Health::new(config.max_health),
            since_last_strike: config.attack_cooldown_seconds,
            config,
        }
    }

    /// Entity ID.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The player's power holder.
    pub const fn holder(&self) -> HolderId {
        self.holder
    }

    /// Current position.
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Move the player.
    pub const fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Hit points.
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Radius within which drops are collected.
    pub const fn pickup_radius(&self) -> f32 {
        self.config.pickup_radius
    }

    /// Whether the strike cooldown has elapsed.
    pub const fn is_ready(&self) -> bool {
        self.since_last_strike >= self.config.attack_cooldown_seconds
    }

    /// Advance the cooldown and strike the nearest raider or rebel in
    /// reach, if ready.
    pub fn tick(&mut self, dt: f32, spatial: &dyn SpatialQuery) -> Option<CombatEffect> {
        if self.health.is_dead() {
            return None;
        }
        self.since_last_strike += dt.max(0.0);
        if !self.is_ready() {
            return None;
        }
        let target = spatial
            .query_candidates_in_radius(self.position, self.config.attack_range, &PLAYER_TARGETS)
            .into_iter()
            .next()?;
        Some(self.strike(target.id))
    }

    /// Strike `target` directly, if ready and in reach. Any entity can be
    /// struck this way, villagers included.
    pub fn try_strike(&mut self, target: EntityId, spatial: &dyn SpatialQuery) -> Option<CombatEffect> {
        if self.health.is_dead() || !self.is_ready() || target == self.id {
            return None;
        }
        let (position, _) = spatial.locate(target)?;
        (position.distance(self.position) <= self.config.attack_range).then(|| self.strike(target))
    }

    fn strike(&mut self, target: EntityId) -> CombatEffect {
        self.since_last_strike = 0.0;
        debug!(player = %self.id, target = %target, damage = self.config.damage, "Player strike");
        CombatEffect::Damage {
            source: self.id,
            target,
            amount: self.config.damage,
        }
    }
}

impl Damageable for Player {
    fn take_damage(&mut self, amount: f32, source: Option<EntityId>) -> f32 {
        self.health.take_damage(amount, source)
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
// Raiders
// ---------------------------------------------------------------------------

/// A hostile raider.
#[derive(Debug)]
pub struct Raider {
    id: EntityId,
    health: Health,
    mover: StraightLineMover,
    target: Option<EntityId>,
    since_last_strike: f32,
}

impl Raider {
    /// A raider at `position`.
    pub fn new(position: Vec2, config: &RaiderConfig) -> Self {
        Self {
            id: EntityId::new(),
            health: Health::new(config.max_health),
            mover: StraightLineMover::new(position, config.move_speed),
            target: None,
            since_last_strike: config.attack_cooldown_seconds,
        }
    }

    /// Entity ID.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Current position.
    pub fn position(&self) -> Vec2 {
        self.mover.position()
    }

    /// Current target.
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Hit points.
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Chase the nearest prey and strike it when in reach.
    pub fn tick(
        &mut self,
        dt: f32,
        spatial: &dyn SpatialQuery,
        config: &RaiderConfig,
    ) -> Option<CombatEffect> {
        if self.health.is_dead() {
            return None;
        }
        let dt = dt.max(0.0);
        self.since_last_strike += dt;

        let position = self.mover.position();
        let prey = spatial
            .query_candidates_in_radius(position, f32::MAX, &RAIDER_TARGETS)
            .into_iter()
            .next();
        match prey {
            Some(candidate) if self.target != Some(candidate.id) => {
                self.target = Some(candidate.id);
                self.mover
                    .set_destination_entity(candidate.id, config.attack_range * CHASE_STOP_FRACTION);
            }
            Some(_) => {}
            None => {
                if self.target.take().is_some() {
                    self.mover.clear_destination();
                }
            }
        }

        let mut effect = None;
        if let Some(candidate) = prey
            && candidate.distance <= config.attack_range
            && self.since_last_strike >= config.attack_cooldown_seconds
        {
            self.since_last_strike = 0.0;
            effect = Some(CombatEffect::Damage {
                source: self.id,
                target: candidate.id,
                amount: config.damage,
            });
        }

        self.mover.advance(dt, spatial);
        effect
    }
}

impl Damageable for Raider {
    fn take_damage(&mut self, amount: f32, source: Option<EntityId>) -> f32 {
        self.health.take_damage(amount, source)
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
// Buildings
// ---------------------------------------------------------------------------

/// A structure that supports its residents.
#[derive(Debug, Clone)]
pub struct Building {
    id: EntityId,
    name: String,
    position: Vec2,
    health: Health,
}

impl Building {
    /// A standing building.
    pub fn new(name: impl Into<String>, position: Vec2, max_health: f32) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            position,
            health: Health::new(max_health),
        }
    }

    /// Entity ID.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position.
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Whether the building has fallen.
    pub fn is_destroyed(&self) -> bool {
        self.health.is_dead()
    }

    /// Hit points.
    pub const fn health(&self) -> &Health {
        &self.health
    }

    /// Damage the building. Returns `true` on the hit that destroys it.
    pub fn damage(&mut self, amount: f32, source: Option<EntityId>) -> bool {
        if self.is_destroyed() {
            return false;
        }
        self.health.take_damage(amount, source);
        self.is_destroyed()
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The player, raiders, buildings and drop sites.
#[derive(Debug)]
pub struct World {
    player: Player,
    raiders: BTreeMap<EntityId, Raider>,
    buildings: BTreeMap<EntityId, Building>,
    drops: BTreeMap<DropId, Vec2>,
}

impl World {
    /// A world with only the player in it.
    pub const fn new(player: Player) -> Self {
        Self {
            player,
            raiders: BTreeMap::new(),
            buildings: BTreeMap::new(),
            drops: BTreeMap::new(),
        }
    }

    /// The player.
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// The player, mutably.
    pub const fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Add a raider.
    pub fn add_raider(&mut self, raider: Raider) -> EntityId {
        let id = raider.id();
        self.raiders.insert(id, raider);
        id
    }

    /// Remove a raider.
    pub fn remove_raider(&mut self, id: EntityId) -> Option<Raider> {
        self.raiders.remove(&id)
    }

    /// A raider by ID.
    pub fn raider(&self, id: EntityId) -> Option<&Raider> {
        self.raiders.get(&id)
    }

    /// A raider by ID, mutably.
    pub fn raider_mut(&mut self, id: EntityId) -> Option<&mut Raider> {
        self.raiders.get_mut(&id)
    }

    /// Every raider.
    pub fn raiders(&self) -> impl Iterator<Item = &Raider> {
        self.raiders.values()
    }

    /// Every raider ID, in spawn order.
    pub fn raider_ids(&self) -> Vec<EntityId> {
        self.raiders.keys().copied().collect()
    }

    /// Living raiders.
    pub fn raiders_alive(&self) -> usize {
        self.raiders.values().filter(|r| !r.health.is_dead()).count()
    }

    /// Add a building.
    pub fn add_building(&mut self, building: Building) -> EntityId {
        let id = building.id();
        self.buildings.insert(id, building);
        id
    }

    /// A building by ID.
    pub fn building(&self, id: EntityId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    /// A building by ID, mutably.
    pub fn building_mut(&mut self, id: EntityId) -> Option<&mut Building> {
        self.buildings.get_mut(&id)
    }

    /// Every building, standing or not.
    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    /// Record where a drop landed.
    pub fn place_drop(&mut self, drop: DropId, position: Vec2) {
        self.drops.insert(drop, position);
    }

    /// Forget a drop site.
    pub fn clear_drop(&mut self, drop: DropId) -> Option<Vec2> {
        self.drops.remove(&drop)
    }

    /// Where a drop lies.
    pub fn drop_position(&self, drop: DropId) -> Option<Vec2> {
        self.drops.get(&drop).copied()
    }

    /// Drops within the player's pickup radius, in ID order.
    pub fn drops_in_pickup_range(&self) -> Vec<DropId> {
        let center = self.player.position;
        let radius = self.player.pickup_radius();
        self.drops
            .iter()
            .filter(|(_, position)| position.distance(center) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Which kind of non-villager entity `id` is, if any.
    pub fn category_of(&self, id: EntityId) -> Option<EntityCategory> {
        if id == self.player.id {
            Some(EntityCategory::Player)
        } else if self.raiders.contains_key(&id) {
            Some(EntityCategory::Hostile)
        } else if self.buildings.contains_key(&id) {
            Some(EntityCategory::Building)
        } else {
            None
        }
    }
}
