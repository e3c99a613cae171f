//! Spatial queries over the map.
//!
//! Combat, influence and witness checks never walk the world directly.
//! They ask a [`SpatialQuery`] for candidates, which the simulation
//! rebuilds once per frame as a [`SpatialIndex`] snapshot. Handles in a
//! snapshot stay valid for the whole frame even if the entity dies
//! mid-frame; callers resolve them again before use.

use glam::Vec2;
use hearthguard_types::{EntityCategory, EntityId};

/// An entity returned by a spatial query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Entity handle.
    pub id: EntityId,
    /// Category at snapshot time.
    pub category: EntityCategory,
    /// Position at snapshot time.
    pub position: Vec2,
    /// Distance from the query center.
    pub distance: f32,
}

/// Read-only view of where things are.
pub trait SpatialQuery {
    /// Entities of the given categories within `radius` of `center`,
    /// nearest first. Ties are broken by ID.
    fn query_candidates_in_radius(
        &self,
        center: Vec2,
        radius: f32,
        categories: &[EntityCategory],
    ) -> Vec<Candidate>;

    /// Position and category of an entity, or `None` if it no longer
    /// exists.
    fn locate(&self, id: EntityId) -> Option<(Vec2, EntityCategory)>;

    /// Whether any entity of `category` exists anywhere.
    fn any_in_category(&self, category: EntityCategory) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    id: EntityId,
    category: EntityCategory,
    position: Vec2,
}

/// Brute-force per-frame snapshot.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    entries: Vec<Entry>,
}

impl SpatialIndex {
    /// Empty index.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an entity. Later inserts of the same ID shadow earlier ones.
    pub fn insert(&mut self, id: EntityId, category: EntityCategory, position: Vec2) {
        self.entries.retain(|e| e.id != id);
        self.entries.push(Entry {
            id,
            category,
            position,
        });
    }

    /// Drop an entity from the snapshot.
    pub fn remove(&mut self, id: EntityId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Number of entities.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SpatialQuery for SpatialIndex {
    fn query_candidates_in_radius(
        &self,
        center: Vec2,
        radius: f32,
        categories: &[EntityCategory],
    ) -> Vec<Candidate> {
        let mut found: Vec<Candidate> = self
            .entries
            .iter()
            .filter(|e| categories.contains(&e.category))
            .filter_map(|e| {
                let distance = e.position.distance(center);
                (distance <= radius).then_some(Candidate {
                    id: e.id,
                    category: e.category,
                    position: e.position,
                    distance,
                })
            })
            .collect();
        found.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        found
    }

    fn locate(&self, id: EntityId) -> Option<(Vec2, EntityCategory)> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| (e.position, e.category))
    }

    fn any_in_category(&self, category: EntityCategory) -> bool {
        self.entries.iter().any(|e| e.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_filters_and_sorts() {
        let mut index = SpatialIndex::new();
        let near = EntityId::new();
        let far = EntityId::new();
        let wrong = EntityId::new();
        index.insert(far, EntityCategory::Hostile, Vec2::new(4.0, 0.0));
        index.insert(near, EntityCategory::Hostile, Vec2::new(1.0, 0.0));
        index.insert(wrong, EntityCategory::Building, Vec2::new(0.5, 0.0));

        let found = index.query_candidates_in_radius(Vec2::ZERO, 5.0, &[EntityCategory::Hostile]);
        let ids: Vec<EntityId> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![near, far]);

        let close = index.query_candidates_in_radius(Vec2::ZERO, 2.0, &[EntityCategory::Hostile]);
        assert_eq!(close.len(), 1);
    }

    #[test]
    fn insert_replaces_existing() {
        let mut index = SpatialIndex::new();
        let id = EntityId::new();
        index.insert(id, EntityCategory::LoyalVillager, Vec2::ZERO);
        index.insert(id, EntityCategory::RebelVillager, Vec2::ONE);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.locate(id),
            Some((Vec2::ONE, EntityCategory::RebelVillager))
        );
        assert!(!index.any_in_category(EntityCategory::LoyalVillager));
    }

    #[test]
    fn removed_entities_cannot_be_located() {
        let mut index = SpatialIndex::new();
        let id = EntityId::new();
        index.insert(id, EntityCategory::Hostile, Vec2::ZERO);
        index.remove(id);
        assert!(index.locate(id).is_none());
        assert!(index.is_empty());
    }
}
