//! Attack routines as explicit phase machines.
//!
//! An attack winds up, opens a damage window, then recovers. The routine is
//! advanced by the frame tick instead of sleeping. Dropping the routine is
//! the cancellation: the swing guard goes with it, so a cancelled attack
//! cannot leave a half-open damage window behind.

use std::collections::BTreeSet;

use hearthguard_types::EntityId;

use crate::config::AttackTiming;

/// Targets already struck during the current swing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwingGuard {
    struck: BTreeSet<EntityId>,
}

impl SwingGuard {
    /// An empty guard.
    pub const fn new() -> Self {
        Self {
            struck: BTreeSet::new(),
        }
    }

    /// Record a hit. Returns `false` if `target` was already struck this
    /// swing, in which case the hit must be ignored.
    pub fn try_mark(&mut self, target: EntityId) -> bool {
        self.struck.insert(target)
    }

    /// Whether `target` was already struck this swing.
    pub fn contains(&self, target: EntityId) -> bool {
        self.struck.contains(&target)
    }

    /// Number of targets struck.
    pub fn len(&self) -> usize {
        self.struck.len()
    }

    /// Whether nothing has been struck yet.
    pub fn is_empty(&self) -> bool {
        self.struck.is_empty()
    }
}

/// Phase of an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPhase {
    /// Before the damage window.
    Windup,
    /// Damage window open.
    Active,
    /// After the damage window.
    Recovery,
}

/// What a call to [`AttackRoutine::advance`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackStep {
    /// Still winding up.
    Winding,
    /// The damage window opened this frame.
    Strike,
    /// The damage window is still open.
    Active,
    /// Following through.
    Recovering,
    /// The routine is over and should be dropped.
    Finished,
}

/// One in-flight attack.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackRoutine {
    phase: AttackPhase,
    elapsed: f32,
    target: Option<EntityId>,
    guard: SwingGuard,
}

impl AttackRoutine {
    /// Start winding up against `target`.
    pub const fn new(target: Option<EntityId>) -> Self {
        Self {
            phase: AttackPhase::Windup,
            elapsed: 0.0,
            target,
            guard: SwingGuard::new(),
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> AttackPhase {
        self.phase
    }

    /// Target locked when the attack started.
    pub const fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Targets struck so far.
    pub const fn guard(&self) -> &SwingGuard {
        &self.guard
    }

    /// Mutable access to the swing guard for the damage dealer.
    pub const fn guard_mut(&mut self) -> &mut SwingGuard {
        &mut self.guard
    }

    /// Advance by `dt` seconds. Crosses at most one phase boundary per
    /// call so every phase is observed for at least one frame.
    pub const fn advance(&mut self, dt: f32, timing: &AttackTiming) -> AttackStep {
        self.elapsed += dt.max(0.0);
        match self.phase {
            AttackPhase::Windup => {
                if self.elapsed >= timing.windup {
                    self.elapsed -= timing.windup;
                    self.phase = AttackPhase::Active;
                    AttackStep::Strike
                } else {
                    AttackStep::Winding
                }
            }
            AttackPhase::Active => {
                if self.elapsed >= timing.active {
                    self.elapsed -= timing.active;
                    self.phase = AttackPhase::Recovery;
                    AttackStep::Recovering
                } else {
                    AttackStep::Active
                }
            }
            AttackPhase::Recovery => {
                if self.elapsed >= timing.recovery {
                    AttackStep::Finished
                } else {
                    AttackStep::Recovering
                }
            }
        }
    }
}
