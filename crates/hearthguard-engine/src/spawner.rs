//! Village spawner for seeding the simulation.
//!
//! At startup the spawner raises the buildings on a ring around the
//! player, then recruits a mixed-role village. Each villager is housed
//! round-robin and scattered near its building. Names, scatter, starting
//! food and starting discontent come from a seeded RNG, so the same seed
//! always produces the same village.

use std::f32::consts::TAU;

use glam::Vec2;
use hearthguard_core::{Recruit, Simulation};
use hearthguard_types::{EntityId, Role};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Village layout, read from the `village` section of
/// `hearthguard-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VillageLayout {
    /// Buildings raised at startup.
    pub buildings: u32,
    /// Distance of the buildings from the player.
    pub building_ring_radius: f32,
    /// How far residents stand from their building.
    pub scatter_radius: f32,
    /// Captains to recruit.
    pub captains: u32,
    /// Farmers to recruit.
    pub farmers: u32,
    /// Mages to recruit.
    pub mages: u32,
    /// Builders to recruit.
    pub builders: u32,
    /// Commoners to recruit.
    pub commoners: u32,
    /// Spread the communal pool across the village at every dawn.
    pub auto_distribute_at_dawn: bool,
}

impl Default for VillageLayout {
    fn default() -> Self {
        Self {
            buildings: 3,
            building_ring_radius: 8.0,
            scatter_radius: 3.0,
            captains: 1,
            farmers: 3,
            mages: 2,
            builders: 2,
            commoners: 6,
            auto_distribute_at_dawn: true,
        }
    }
}

impl VillageLayout {
    /// Total villagers the layout recruits.
    pub const fn population(&self) -> u32 {
        self.captains
            .saturating_add(self.farmers)
            .saturating_add(self.mages)
            .saturating_add(self.builders)
            .saturating_add(self.commoners)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.building_ring_radius.is_nan() || self.building_ring_radius < 0.0 {
            return Err(EngineError::Spawner {
                message: "village.building_ring_radius must be non-negative".to_owned(),
            });
        }
        if self.scatter_radius.is_nan() || self.scatter_radius < 0.0 {
            return Err(EngineError::Spawner {
                message: "village.scatter_radius must be non-negative".to_owned(),
            });
        }
        Ok(())
    }

    /// Roles in recruiting order: leaders first, commoners last.
    fn roles(&self) -> Vec<Role> {
        [
            (Role::Captain, self.captains),
            (Role::Farmer, self.farmers),
            (Role::Mage, self.mages),
            (Role::Builder, self.builders),
            (Role::Commoner, self.commoners),
        ]
        .into_iter()
        .flat_map(|(role, count)| std::iter::repeat_n(role, count as usize))
        .collect()
    }
}

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in pool of villager names. Picked without replacement; a suffix
/// keeps names unique once the pool runs out.
const NAME_POOL: &[&str] = &[
    "Alder", "Bram", "Cora", "Dunstan", "Edda", "Fenn", "Garrick", "Hilde",
    "Ilse", "Jory", "Kestrel", "Lorna", "Merrin", "Nell", "Osric", "Piers",
    "Quenby", "Rowan", "Sabine", "Tamsin", "Ulric", "Vesna", "Wystan", "Yara",
];

// -----------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------

/// What the spawner created.
#[derive(Debug, Default)]
pub struct SpawnResult {
    /// Buildings, in ring order.
    pub buildings: Vec<EntityId>,
    /// Villagers, in recruiting order.
    pub villagers: Vec<EntityId>,
}

/// Raise the buildings and recruit the village described by `layout`.
pub fn spawn_village(
    layout: &VillageLayout,
    simulation: &mut Simulation,
    rng: &mut impl Rng,
) -> Result<SpawnResult, EngineError> {
    layout.validate()?;
    let mut result = SpawnResult::default();

    let mut sites = Vec::new();
    for index in 0..layout.buildings {
        let position = ring_position(index, layout.buildings, layout.building_ring_radius);
        let id = simulation.add_building(format!("Hall {}", index.saturating_add(1)), position);
        sites.push((id, position));
        result.buildings.push(id);
    }

    let mut names: Vec<&str> = NAME_POOL.to_vec();
    names.shuffle(rng);

    for (index, role) in layout.roles().into_iter().enumerate() {
        let name = match names.get(index) {
            Some(name) => (*name).to_owned(),
            None => {
                let pool = names.len();
                let base = index
                    .checked_rem(pool)
                    .and_then(|i| names.get(i))
                    .copied()
                    .unwrap_or("Villager");
                let round = index.checked_div(pool).unwrap_or(0).saturating_add(1);
                format!("{base} {round}")
            }
        };

        let site = index
            .checked_rem(sites.len())
            .and_then(|i| sites.get(i))
            .copied();
        let center = site.map_or(Vec2::ZERO, |(_, position)| position);
        let position = scatter(center, layout.scatter_radius, rng);

        let mut recruit = Recruit::new(name, role, position)
            .with_food(rng.random_range(0.8..=1.0))
            .with_discontent(rng.random_range(0.0..15.0));
        if let Some((building, _)) = site {
            recruit = recruit.housed_in(building);
        }

        let id = simulation.recruit(recruit)?;
        debug!(villager = %id, role = %role, x = position.x, y = position.y, "Villager recruited");
        result.villagers.push(id);
    }

    info!(
        buildings = result.buildings.len(),
        villagers = result.villagers.len(),
        "Village spawned"
    );
    Ok(result)
}

/// Evenly spaced point `index` of `count` on a circle around the origin.
#[allow(
    clippy::cast_precision_loss,
    clippy::arithmetic_side_effects,
    reason = "building counts stay far below 2^24; glam math is f32"
)]
fn ring_position(index: u32, count: u32, radius: f32) -> Vec2 {
    let angle = TAU * index as f32 / count.max(1) as f32;
    Vec2::from_angle(angle) * radius
}

/// Uniform random point within `radius` of `center`.
#[allow(clippy::arithmetic_side_effects, reason = "glam vector math on f32 cannot overflow")]
fn scatter(center: Vec2, radius: f32, rng: &mut impl Rng) -> Vec2 {
    let angle = rng.random_range(0.0..TAU);
    let distance = radius * rng.random::<f32>().sqrt();
    center + Vec2::from_angle(angle) * distance
}
