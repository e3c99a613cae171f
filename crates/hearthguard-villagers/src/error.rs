//! Error types for the hearthguard-villagers crate.

use hearthguard_types::EntityId;

/// Errors that can occur while building or configuring villagers.
#[derive(Debug, thiserror::Error)]
pub enum VillagerError {
    /// A configuration value is out of its valid range.
    #[error("invalid villager config `{field}`: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A required builder field was not set.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Villager with the given ID is not on the roster.
    #[error("villager not found: {0}")]
    VillagerNotFound(EntityId),

    /// A villager with this ID is already on the roster.
    #[error("duplicate villager: {0}")]
    DuplicateVillager(EntityId),
}
