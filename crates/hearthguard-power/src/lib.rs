//! Power economy for the Hearthguard village simulation.
//!
//! Power is the village's scarce resource. It lives in a communal pool, in
//! the player's pool, in each villager's pool, or on the ground after a
//! death. It is only created by nightly generation and is never destroyed:
//! uncollected drops expire back into the communal pool.
//!
//! # Architecture
//!
//! - [`holder`] -- [`PowerHolder`], a clamped pool with private fields.
//! - [`economy`] -- [`PowerEconomy`], the only mutator of power.
//! - [`ledger`] -- append-only record of every movement.
//! - [`conservation`] -- replay check that the ledger matches live balances.
//! - [`scoring`] -- greed and rebellion-risk scores.
//!
//! # Invariant
//!
//! For every holder, `0 <= current <= max`. Every operation clamps before
//! it commits, so no sequence of calls can break this.
//!
//! # Usage
//!
//! ```
//! use hearthguard_power::{PowerConfig, PowerEconomy};
//!
//! let mut economy = PowerEconomy::new(PowerConfig {
//!     communal_start: 3,
//!     ..PowerConfig::default()
//! });
//! economy.register_player("Warden").ok();
//!
//! // Asking for more than the pool holds moves what is there.
//! assert_eq!(economy.transfer_power_to_player(5).ok(), Some(3));
//! assert_eq!(economy.communal_power(), 0);
//! assert!(economy.verify_conservation().is_balanced());
//! ```

pub mod conservation;
pub mod economy;
pub mod holder;
pub mod ledger;
pub mod scoring;

pub use conservation::{ConservationResult, PowerAnomaly};
pub use economy::{PowerConfig, PowerDrop, PowerEconomy};
pub use holder::PowerHolder;
pub use ledger::{PowerAccount, PowerEntry, PowerEntryType, PowerLedger};

use hearthguard_types::{DropId, HolderId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by power operations.
#[derive(Debug, thiserror::Error)]
pub enum PowerError {
    /// Amount must be strictly positive.
    #[error("power amount must be non-zero")]
    ZeroAmount,

    /// No holder with this id is registered.
    #[error("unknown power holder: {0}")]
    UnknownHolder(HolderId),

    /// No drop with this id is on the ground.
    #[error("unknown power drop: {0}")]
    UnknownDrop(DropId),

    /// The source has nothing to give.
    #[error("insufficient power: requested {requested}, available {available}")]
    InsufficientPower {
        /// Amount asked for.
        requested: u32,
        /// Amount the source held.
        available: u32,
    },

    /// The destination is at capacity.
    #[error("power holder {holder} is full")]
    HolderFull {
        /// The full holder.
        holder: HolderId,
    },

    /// No player pool has been registered.
    #[error("no player power holder registered")]
    NoPlayer,

    /// A player pool is already registered.
    #[error("a player power holder is already registered")]
    DuplicatePlayer,

    /// Holders must be emptied before removal.
    #[error("power holder {holder} still holds {remaining}")]
    HolderNotEmpty {
        /// The holder.
        holder: HolderId,
        /// Power it still holds.
        remaining: u32,
    },

    /// Source and destination are the same holder.
    #[error("cannot transfer power to the same holder")]
    SameHolder,

    /// The communal pool cannot grow any further.
    #[error("communal power pool overflow")]
    Overflow,

    /// A ledger entry names the wrong kind of account.
    #[error("invalid account for {entry_type:?} {side}: expected {expected}, got {actual}")]
    InvalidAccount {
        /// The entry type being validated.
        entry_type: PowerEntryType,
        /// Which side of the entry ("from" or "to").
        side: &'static str,
        /// The expected account kind.
        expected: &'static str,
        /// The actual account kind.
        actual: &'static str,
    },

    /// An internal error that should not occur in normal operation.
    #[error("internal power error: {0}")]
    Internal(&'static str),
}
