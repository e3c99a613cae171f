//! The "move toward" primitive.
//!
//! Combat and influence only set destinations; they never plan paths.
//! [`StraightLineMover`] walks in a straight line, which is all the
//! headless simulation needs. A host with real navigation plugs in its own
//! [`Movement`].

use glam::Vec2;
use hearthguard_types::EntityId;

use crate::spatial::SpatialQuery;

/// Where a mover is heading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Destination {
    /// Standing still.
    #[default]
    None,
    /// A fixed point.
    Point(Vec2),
    /// Following an entity, stopping `stop_distance` short of it.
    Entity {
        /// The entity to follow.
        target: EntityId,
        /// Distance at which to stop.
        stop_distance: f32,
    },
}

/// Movement collaborator.
pub trait Movement: core::fmt::Debug + Send {
    /// Head for a fixed point.
    fn set_destination(&mut self, point: Vec2);

    /// Follow an entity, stopping `stop_distance` short of it.
    fn set_destination_entity(&mut self, target: EntityId, stop_distance: f32);

    /// Stop moving.
    fn clear_destination(&mut self);

    /// Current destination.
    fn destination(&self) -> Destination;

    /// Distance left to travel, or `None` with no destination or an
    /// entity that can no longer be found.
    fn remaining_distance(&self, spatial: &dyn SpatialQuery) -> Option<f32>;

    /// Current position.
    fn position(&self) -> Vec2;

    /// Scale walking speed (captain influence).
    fn set_speed_multiplier(&mut self, multiplier: f32);

    /// Move for `dt` seconds.
    fn advance(&mut self, dt: f32, spatial: &dyn SpatialQuery);
}

/// Walks straight at its destination.
#[derive(Debug, Clone, PartialEq)]
pub struct StraightLineMover {
    position: Vec2,
    speed: f32,
    speed_multiplier: f32,
    destination: Destination,
}

/// Distance at which a point destination counts as reached.
const ARRIVAL_EPSILON: f32 = 0.05;

impl StraightLineMover {
    /// A mover at `position` walking `speed` units per second.
    pub const fn new(position: Vec2, speed: f32) -> Self {
        Self {
            position,
            speed,
            speed_multiplier: 1.0,
            destination: Destination::None,
        }
    }

    /// Effective speed after multipliers.
    pub const fn speed(&self) -> f32 {
        self.speed * self.speed_multiplier
    }

    fn goal(&self, spatial: &dyn SpatialQuery) -> Option<(Vec2, f32)> {
        match self.destination {
            Destination::None => None,
            Destination::Point(point) => Some((point, ARRIVAL_EPSILON)),
            Destination::Entity {
                target,
                stop_distance,
            } => spatial
                .locate(target)
                .map(|(position, _)| (position, stop_distance)),
        }
    }
}

impl Movement for StraightLineMover {
    fn set_destination(&mut self, point: Vec2) {
        self.destination = Destination::Point(point);
    }

    fn set_destination_entity(&mut self, target: EntityId, stop_distance: f32) {
        self.destination = Destination::Entity {
            target,
            stop_distance: stop_distance.max(0.0),
        };
    }

    fn clear_destination(&mut self) {
        self.destination = Destination::None;
    }

    fn destination(&self) -> Destination {
        self.destination
    }

    fn remaining_distance(&self, spatial: &dyn SpatialQuery) -> Option<f32> {
        self.goal(spatial)
            .map(|(goal, stop)| (self.position.distance(goal) - stop).max(0.0))
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier.max(0.0);
    }

    #[allow(clippy::arithmetic_side_effects, reason = "glam vector math on f32 cannot overflow")]
    fn advance(&mut self, dt: f32, spatial: &dyn SpatialQuery) {
        let Some((goal, stop)) = self.goal(spatial) else {
            // The followed entity is gone.
            if matches!(self.destination, Destination::Entity { .. }) {
                self.destination = Destination::None;
            }
            return;
        };
        let offset = goal - self.position;
        let distance = offset.length();
        let remaining = distance - stop;
        if remaining <= 0.0 {
            if matches!(self.destination, Destination::Point(_)) {
                self.destination = Destination::None;
            }
            return;
        }
        let step = (self.speed() * dt).min(remaining);
        self.position += offset.normalize_or_zero() * step;
    }
}
