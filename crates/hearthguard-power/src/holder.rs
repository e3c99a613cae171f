//! A single power pool.
//!
//! [`PowerHolder`] fields are private. The only way to change `current` is
//! through the crate-internal [`credit`](PowerHolder::credit) and
//! [`debit`](PowerHolder::debit) methods, both of which clamp before they
//! commit. `0 <= current <= max` therefore holds for every holder at all
//! times.

use hearthguard_types::{HolderId, PowerHolderSnapshot};

/// A named power pool with a fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerHolder {
    id: HolderId,
    name: String,
    current: u32,
    max: u32,
    is_player: bool,
}

impl PowerHolder {
    pub(crate) fn new(name: String, max: u32, is_player: bool) -> Self {
        Self {
            id: HolderId::new(),
            name,
            current: 0,
            max,
            is_player,
        }
    }

    /// Holder identifier.
    pub const fn id(&self) -> HolderId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Power currently held.
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Capacity.
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Whether this pool belongs to the player.
    pub const fn is_player(&self) -> bool {
        self.is_player
    }

    /// Room left before the pool is full.
    pub const fn free_capacity(&self) -> u32 {
        self.max.saturating_sub(self.current)
    }

    /// Whether the pool is at capacity.
    pub const fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Fraction of capacity in use, in `[0, 1]`. A zero-capacity pool
    /// counts as full.
    pub const fn fill_ratio(&self) -> f32 {
        if self.max == 0 {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss, reason = "pool capacities stay far below 2^24")]
        let ratio = self.current as f32 / self.max as f32;
        ratio
    }

    /// Add up to `amount`, clamped to free capacity. Returns what was accepted.
    pub(crate) fn credit(&mut self, amount: u32) -> u32 {
        let accepted = amount.min(self.free_capacity());
        self.current = self.current.saturating_add(accepted);
        accepted
    }

    /// Remove up to `amount`, clamped to what is held. Returns what was removed.
    pub(crate) fn debit(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.current);
        self.current = self.current.saturating_sub(removed);
        removed
    }

    /// Read-only copy for the UI.
    pub fn snapshot(&self) -> PowerHolderSnapshot {
        PowerHolderSnapshot {
            id: self.id,
            name: self.name.clone(),
            current: self.current,
            max: self.max,
            is_player: self.is_player,
        }
    }
}
