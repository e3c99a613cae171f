//! Append-only log of every power movement.
//!
//! Each entry records a debit account, a credit account and a strictly
//! positive amount. The account kinds allowed on either side are fixed per
//! [`PowerEntryType`]:
//!
//! | Type | From (debit) | To (credit) |
//! |------|-------------|-------------|
//! | Generate | Source | Communal |
//! | Allocate | Communal | Holder |
//! | Reclaim | Holder | Communal |
//! | Transfer | Holder | Holder |
//! | Drop | Holder | Ground |
//! | Pickup | Ground | Holder |
//! | Expire | Ground | Communal |
//!
//! `Source` is the only account allowed to go negative. Replaying the log
//! therefore reconstructs every balance in the economy, which is what
//! [`verify_conservation`](crate::conservation::verify_conservation) does.

use hearthguard_types::{DropId, HolderId};

use crate::PowerError;

/// Category of a power movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PowerEntryType {
    /// New power enters the communal pool.
    Generate,
    /// Communal pool to a holder.
    Allocate,
    /// Holder back to the communal pool.
    Reclaim,
    /// Holder to holder.
    Transfer,
    /// Holder onto the ground (death).
    Drop,
    /// Ground into a holder.
    Pickup,
    /// Uncollected ground power returns to the communal pool.
    Expire,
}

/// One side of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PowerAccount {
    /// Outside the economy. Generation debits this account.
    Source,
    /// The shared communal pool.
    Communal,
    /// A registered holder.
    Holder(HolderId),
    /// A pile of dropped power.
    Ground(DropId),
}

impl PowerAccount {
    const fn kind(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Communal => "communal",
            Self::Holder(_) => "holder",
            Self::Ground(_) => "ground",
        }
    }
}

/// A recorded power movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerEntry {
    /// Position in the ledger (0-indexed, gap-free).
    pub sequence: u64,
    /// Category of movement.
    pub entry_type: PowerEntryType,
    /// Debit side.
    pub from: PowerAccount,
    /// Credit side.
    pub to: PowerAccount,
    /// Amount moved (always > 0).
    pub amount: u32,
}

/// Expected (from, to) account kinds for an entry type.
const fn expected_kinds(entry_type: PowerEntryType) -> (&'static str, &'static str) {
    match entry_type {
        PowerEntryType::Generate => ("source", "communal"),
        PowerEntryType::Allocate => ("communal", "holder"),
        PowerEntryType::Reclaim => ("holder", "communal"),
        PowerEntryType::Expire => ("ground", "communal"),
        PowerEntryType::Transfer => ("holder", "holder"),
        PowerEntryType::Drop => ("holder", "ground"),
        PowerEntryType::Pickup => ("ground", "holder"),
    }
}

/// The power ledger.
#[derive(Debug, Default)]
pub struct PowerLedger {
    entries: Vec<PowerEntry>,
}

impl PowerLedger {
    /// Create an empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of entries.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[PowerEntry] {
        &self.entries
    }

    /// Validate and append an entry.
    ///
    /// # Errors
    ///
    /// Returns [`PowerError::ZeroAmount`] for an empty movement and
    /// [`PowerError::InvalidAccount`] when either side has the wrong
    /// account kind for `entry_type`.
    pub fn record(
        &mut self,
        entry_type: PowerEntryType,
        from: PowerAccount,
        to: PowerAccount,
        amount: u32,
    ) -> Result<&PowerEntry, PowerError> {
        if amount == 0 {
            return Err(PowerError::ZeroAmount);
        }

        let (expected_from, expected_to) = expected_kinds(entry_type);
        if from.kind() != expected_from {
            return Err(PowerError::InvalidAccount {
                entry_type,
                side: "from",
                expected: expected_from,
                actual: from.kind(),
            });
        }
        if to.kind() != expected_to {
            return Err(PowerError::InvalidAccount {
                entry_type,
                side: "to",
                expected: expected_to,
                actual: to.kind(),
            });
        }

        let sequence = u64::try_from(self.entries.len()).unwrap_or(u64::MAX);
        self.entries.push(PowerEntry {
            sequence,
            entry_type,
            from,
            to,
            amount,
        });

        self.entries
            .last()
            .ok_or(PowerError::Internal("failed to retrieve entry after append"))
    }

    /// Total power ever generated into the economy.
    pub fn total_generated(&self) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.entry_type == PowerEntryType::Generate)
            .map(|e| u64::from(e.amount))
            .sum()
    }

    /// Entries that touched the given holder, oldest first.
    pub fn history_for(&self, holder: HolderId) -> Vec<&PowerEntry> {
        let account = PowerAccount::Holder(holder);
        self.entries
            .iter()
            .filter(|e| e.from == account || e.to == account)
            .collect()
    }
}
