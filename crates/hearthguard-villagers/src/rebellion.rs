//! The rebellion telegraph.
//!
//! Once discontent reaches the rebel threshold the villager spends a fixed
//! warning window flashing Angry before it commits. The sequence cannot be
//! cancelled or restarted: `Idle -> Telegraph -> Committed`, one way.

/// Where a villager is in the rebellion sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum RebellionPhase {
    /// Not rebelling.
    #[default]
    Idle,
    /// Counting down; `elapsed` seconds into the warning window.
    Telegraph {
        /// Seconds since the sequence started.
        elapsed: f32,
    },
    /// Rebellion has committed.
    Committed,
}

/// Explicit state machine replacing a timed coroutine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RebellionSequence {
    phase: RebellionPhase,
}

impl RebellionSequence {
    /// A sequence that has not started.
    pub const fn new() -> Self {
        Self {
            phase: RebellionPhase::Idle,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> RebellionPhase {
        self.phase
    }

    /// Begin the warning window. Returns `false` if the sequence was
    /// already running or committed.
    pub const fn start(&mut self) -> bool {
        if matches!(self.phase, RebellionPhase::Idle) {
            self.phase = RebellionPhase::Telegraph { elapsed: 0.0 };
            true
        } else {
            false
        }
    }

    /// Advance the countdown. Returns `true` exactly once: on the call
    /// that crosses `telegraph_seconds`.
    pub const fn advance(&mut self, dt: f32, telegraph_seconds: f32) -> bool {
        let RebellionPhase::Telegraph { elapsed } = self.phase else {
            return false;
        };
        let elapsed = elapsed + dt.max(0.0);
        if elapsed >= telegraph_seconds {
            self.phase = RebellionPhase::Committed;
            true
        } else {
            self.phase = RebellionPhase::Telegraph { elapsed };
            false
        }
    }

    /// Whether the warning window is running.
    pub const fn is_pending(&self) -> bool {
        matches!(self.phase, RebellionPhase::Telegraph { .. })
    }

    /// Whether the villager has committed to rebellion.
    pub const fn is_committed(&self) -> bool {
        matches!(self.phase, RebellionPhase::Committed)
    }

    /// Seconds left in the warning window, if running.
    pub const fn remaining(&self, telegraph_seconds: f32) -> Option<f32> {
        match self.phase {
            RebellionPhase::Telegraph { elapsed } => Some((telegraph_seconds - elapsed).max(0.0)),
            RebellionPhase::Idle | RebellionPhase::Committed => None,
        }
    }
}
