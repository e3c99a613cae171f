//! Shared type definitions for the Hearthguard village simulation.
//!
//! This crate is the single source of truth for identifiers, enums, events
//! and UI snapshots used across the workspace. Types flow downstream to
//! `TypeScript` via `ts-rs` for the HUD.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entities, power holders and drops
//! - [`enums`] -- Roles, morale states, tiers, factions and spatial categories
//! - [`events`] -- The [`SimEvent`] notification vocabulary
//! - [`structs`] -- Read-only snapshots for the UI surface

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

pub use enums::{EntityCategory, Faction, FlashColor, Role, Tier, VillagerState};
pub use events::SimEvent;
pub use ids::{DropId, EntityId, EventId, HolderId};
pub use structs::{EconomySnapshot, PowerHolderSnapshot, VillageSnapshot, VillagerSnapshot};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Writes to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::EntityId::export_all();
        let _ = crate::ids::HolderId::export_all();
        let _ = crate::ids::DropId::export_all();
        let _ = crate::ids::EventId::export_all();

        let _ = crate::enums::Role::export_all();
        let _ = crate::enums::VillagerState::export_all();
        let _ = crate::enums::Tier::export_all();
        let _ = crate::enums::Faction::export_all();
        let _ = crate::enums::EntityCategory::export_all();
        let _ = crate::enums::FlashColor::export_all();

        let _ = crate::events::SimEvent::export_all();

        let _ = crate::structs::VillagerSnapshot::export_all();
        let _ = crate::structs::PowerHolderSnapshot::export_all();
        let _ = crate::structs::EconomySnapshot::export_all();
        let _ = crate::structs::VillageSnapshot::export_all();
    }
}
