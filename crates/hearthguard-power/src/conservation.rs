//! Conservation check for the power economy.
//!
//! Power only enters through `Generate` entries and never leaves. Replaying
//! the ledger from zero must therefore reproduce the live balance of every
//! account, and the `Source` account must equal minus the total in
//! circulation. A mismatch produces a [`PowerAnomaly`].

use std::collections::BTreeMap;

use crate::ledger::{PowerAccount, PowerEntry};

/// A mismatch between replayed and live balances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerAnomaly {
    /// Accounts whose live balance disagrees with the replay:
    /// `(replayed, live)`.
    pub mismatches: BTreeMap<PowerAccount, (i64, i64)>,
    /// Human-readable description.
    pub message: String,
}

impl core::fmt::Display for PowerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Result of a conservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// Every account matches its replayed balance.
    Balanced,
    /// At least one account disagrees.
    Anomaly(PowerAnomaly),
}

impl ConservationResult {
    /// Whether the check passed.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Replay `entries` and compare against the `live` balances.
///
/// `live` must contain every non-source account the caller knows about,
/// including empty ones. Accounts that appear in the replay with a zero
/// balance but are absent from `live` (for example a removed holder that
/// was emptied first) are not mismatches.
pub fn verify_conservation(
    entries: &[PowerEntry],
    live: &BTreeMap<PowerAccount, u32>,
) -> ConservationResult {
    let mut replayed: BTreeMap<PowerAccount, i64> = BTreeMap::new();

    for entry in entries {
        let amount = i64::from(entry.amount);
        let debit = replayed.entry(entry.from).or_insert(0);
        *debit = debit.saturating_sub(amount);
        let credit = replayed.entry(entry.to).or_insert(0);
        *credit = credit.saturating_add(amount);
    }

    let mut mismatches = BTreeMap::new();
    let mut circulating: i64 = 0;

    for (account, balance) in live {
        let live_balance = i64::from(*balance);
        circulating = circulating.saturating_add(live_balance);
        let replay_balance = replayed.get(account).copied().unwrap_or(0);
        if replay_balance != live_balance {
            mismatches.insert(*account, (replay_balance, live_balance));
        }
    }

    for (account, balance) in &replayed {
        if *account == PowerAccount::Source || live.contains_key(account) {
            continue;
        }
        if *balance != 0 {
            mismatches.insert(*account, (*balance, 0));
        }
    }

    let source = replayed.get(&PowerAccount::Source).copied().unwrap_or(0);
    if source.saturating_add(circulating) != 0 {
        mismatches.insert(PowerAccount::Source, (source, circulating.saturating_neg()));
    }

    if mismatches.is_empty() {
        ConservationResult::Balanced
    } else {
        let message = format!(
            "POWER_ANOMALY: {} account(s) disagree with ledger replay",
            mismatches.len()
        );
        ConservationResult::Anomaly(PowerAnomaly {
            mismatches,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use hearthguard_types::HolderId;

    use super::*;
    use crate::ledger::{PowerEntryType, PowerLedger};

    fn sample() -> (PowerLedger, HolderId) {
        let mut ledger = PowerLedger::new();
        let holder = HolderId::new();
        let _ = ledger.record(
            PowerEntryType::Generate,
            PowerAccount::Source,
            PowerAccount::Communal,
            10,
        );
        let _ = ledger.record(
            PowerEntryType::Allocate,
            PowerAccount::Communal,
            PowerAccount::Holder(holder),
            4,
        );
        (ledger, holder)
    }

    #[test]
    fn balanced_when_live_matches_replay() {
        let (ledger, holder) = sample();
        let mut live = BTreeMap::new();
        live.insert(PowerAccount::Communal, 6);
        live.insert(PowerAccount::Holder(holder), 4);
        assert_eq!(
            verify_conservation(ledger.entries(), &live),
            ConservationResult::Balanced
        );
    }

    #[test]
    fn anomaly_when_balance_drifts() {
        let (ledger, holder) = sample();
        let mut live = BTreeMap::new();
        live.insert(PowerAccount::Communal, 6);
        live.insert(PowerAccount::Holder(holder), 5);
        let result = verify_conservation(ledger.entries(), &live);
        assert!(!result.is_balanced());
        if let ConservationResult::Anomaly(anomaly) = result {
            assert_eq!(
                anomaly.mismatches.get(&PowerAccount::Holder(holder)),
                Some(&(4, 5))
            );
        }
    }
}
