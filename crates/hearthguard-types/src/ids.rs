//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Villagers, raiders, the player and buildings all share the [`EntityId`]
//! space so that spatial queries and damage routing can address any of them
//! uniformly. Power pools and dropped power get their own identifier types
//! so a holder can never be confused with the entity that owns it.
//!
//! All IDs use UUID v7 (time-ordered), so iterating a `BTreeMap` keyed by
//! ID visits entities in creation order. Cascade evaluation relies on this
//! for a stable delivery order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for anything that occupies the map: villagers,
    /// raiders, the player, and buildings.
    EntityId
}

define_id! {
    /// Unique identifier for a power pool (one per villager plus the player).
    HolderId
}

define_id! {
    /// Unique identifier for a pile of power dropped on the ground.
    DropId
}

define_id! {
    /// Unique identifier for a published simulation event.
    EventId
}
