//! Who a villager fights and when it may fight at all.

use glam::Vec2;
use hearthguard_types::{EntityCategory, EntityId, VillagerState};

use crate::config::CombatConfig;
use crate::spatial::{Candidate, SpatialQuery};

const LOYAL_ALLIES: [EntityCategory; 1] = [EntityCategory::LoyalVillager];
const REBEL_ALLIES: [EntityCategory; 1] = [EntityCategory::RebelVillager];

/// Categories a villager in `state` attacks.
pub const fn hostile_categories(state: VillagerState) -> &'static [EntityCategory] {
    match state {
        VillagerState::Loyal | VillagerState::Angry => &EntityCategory::LOYAL_TARGETS,
        VillagerState::Rebel => &EntityCategory::REBEL_TARGETS,
    }
}

/// Categories a villager in `state` supports (mage buffs and heals).
pub const fn ally_categories(state: VillagerState) -> &'static [EntityCategory] {
    match state {
        VillagerState::Loyal | VillagerState::Angry => &LOYAL_ALLIES,
        VillagerState::Rebel => &REBEL_ALLIES,
    }
}

/// Frames between target searches. Angry villagers react half as often.
pub const fn retarget_interval(state: VillagerState, config: &CombatConfig) -> u32 {
    match state {
        VillagerState::Angry => config.angry_retarget_frames,
        VillagerState::Loyal | VillagerState::Rebel => config.retarget_frames,
    }
}

/// Detection radius after efficiency scaling.
pub const fn effective_detection(detection_radius: f32, efficiency: f32) -> f32 {
    detection_radius * efficiency
}

/// Whether a villager should be in combat mode.
///
/// Inactive villagers never fight. Rebels always do. Loyal and Angry
/// villagers fight when any hostile exists on the map or a rebel is
/// within their (efficiency-scaled) detection radius.
pub fn can_combat(
    is_active: bool,
    state: VillagerState,
    position: Vec2,
    detection: f32,
    spatial: &dyn SpatialQuery,
) -> bool {
    if !is_active {
        return false;
    }
    if state == VillagerState::Rebel {
        return true;
    }
    spatial.any_in_category(EntityCategory::Hostile)
        || !spatial
            .query_candidates_in_radius(position, detection, &[EntityCategory::RebelVillager])
            .is_empty()
}

/// Nearest hostile within `radius`, excluding `attacker` itself.
pub fn nearest_target(
    attacker: EntityId,
    position: Vec2,
    radius: f32,
    categories: &[EntityCategory],
    spatial: &dyn SpatialQuery,
) -> Option<Candidate> {
    spatial
        .query_candidates_in_radius(position, radius, categories)
        .into_iter()
        .find(|c| c.id != attacker)
}
