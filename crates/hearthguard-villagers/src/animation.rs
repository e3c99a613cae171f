//! Fire-and-forget visual triggers.
//!
//! Nothing in the simulation reads back from an [`Animator`]. The headless
//! build uses [`TracingAnimator`], which turns triggers into `trace!`
//! lines.

use hearthguard_types::{EntityId, FlashColor, Role};
use tracing::trace;

/// Animation and visual-feedback collaborator.
pub trait Animator: core::fmt::Debug + Send {
    /// Play the role's attack animation.
    fn play_attack_anim(&mut self, role: Role);

    /// Tint the sprite for `duration` seconds.
    fn flash(&mut self, color: FlashColor, duration: f32);
}

/// Discards every trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAnimator;

impl Animator for NullAnimator {
    fn play_attack_anim(&mut self, _role: Role) {}

    fn flash(&mut self, _color: FlashColor, _duration: f32) {}
}

/// Logs triggers at trace level.
#[derive(Debug, Clone, Copy)]
pub struct TracingAnimator {
    entity: EntityId,
}

impl TracingAnimator {
    /// Animator for one entity.
    pub const fn new(entity: EntityId) -> Self {
        Self { entity }
    }
}

impl Animator for TracingAnimator {
    fn play_attack_anim(&mut self, role: Role) {
        trace!(entity = %self.entity, %role, "attack animation");
    }

    fn flash(&mut self, color: FlashColor, duration: f32) {
        trace!(entity = %self.entity, ?color, duration, "flash");
    }
}
