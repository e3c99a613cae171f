//! The power economy: communal pool, holders, drops, and the ledger.
//!
//! [`PowerEconomy`] is the only type that mutates power. Every public
//! operation clamps before it commits and records the movement in the
//! [`PowerLedger`]. Requests that cannot move anything return a
//! [`PowerError`]; requests that can only be partly honored move what they
//! can and report the amount.

use std::collections::BTreeMap;

use hearthguard_types::{DropId, EconomySnapshot, HolderId};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::conservation::{self, ConservationResult};
use crate::holder::PowerHolder;
use crate::ledger::{PowerAccount, PowerEntryType, PowerLedger};
use crate::scoring;
use crate::PowerError;

/// Tunables for the power economy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    /// Power in the communal pool at simulation start (default: 10).
    pub communal_start: u32,
    /// Capacity of the player's pool (default: 50).
    pub player_capacity: u32,
    /// Capacity of each villager's pool (default: 6).
    pub villager_capacity: u32,
    /// Greed above which villagers start to resent the player (default: 0.5).
    pub greed_threshold: f32,
    /// Power generated into the communal pool at each nightfall (default: 2).
    pub nightly_generation: u32,
    /// Seconds an uncollected drop lies on the ground before returning to
    /// the communal pool (default: 30).
    pub drop_lifetime_seconds: f32,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            communal_start: 10,
            player_capacity: 50,
            villager_capacity: 6,
            greed_threshold: 0.5,
            nightly_generation: 2,
            drop_lifetime_seconds: 30.0,
        }
    }
}

/// Power lying on the ground.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerDrop {
    /// Power remaining in the drop.
    pub amount: u32,
    /// Seconds since the drop appeared.
    pub age_seconds: f32,
}

/// Communal and per-holder power pools.
#[derive(Debug)]
pub struct PowerEconomy {
    config: PowerConfig,
    communal: u32,
    holders: BTreeMap<HolderId, PowerHolder>,
    player: Option<HolderId>,
    drops: BTreeMap<DropId, PowerDrop>,
    ledger: PowerLedger,
}

impl PowerEconomy {
    /// Create an economy and seed the communal pool from `config`.
    pub fn new(config: PowerConfig) -> Self {
        let start = config.communal_start;
        let mut economy = Self {
            communal: 0,
            holders: BTreeMap::new(),
            player: None,
            drops: BTreeMap::new(),
            ledger: PowerLedger::new(),
            config,
        };
        if start > 0 {
            // Cannot fail: amount is non-zero and the account kinds are fixed.
            let _ = economy.generate(start);
        }
        economy
    }

    /// The configuration this economy was built with.
    pub const fn config(&self) -> &PowerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Holders
    // -----------------------------------------------------------------------

    /// Register a new, empty holder.
    ///
    /// # Errors
    ///
    /// Returns [`PowerError::DuplicatePlayer`] if `is_player` is set and a
    /// player holder already exists.
    pub fn register_holder(
        &mut self,
        name: impl Into<String>,
        max: u32,
        is_player: bool,
    ) -> Result<HolderId, PowerError> {
        if is_player && self.player.is_some() {
            return Err(PowerError::DuplicatePlayer);
        }
        let holder = PowerHolder::new(name.into(), max, is_player);
        let id = holder.id();
        debug!(holder = %id, name = holder.name(), max, is_player, "Power holder registered");
        if is_player {
            self.player = Some(id);
        }
        self.holders.insert(id, holder);
        Ok(id)
    }

    /// Register the player's pool with the configured capacity.
    ///
    /// # Errors
    ///
    /// Returns [`PowerError::DuplicatePlayer`] if one already exists.
    pub fn register_player(&mut self, name: impl Into<String>) -> Result<HolderId, PowerError> {
        let capacity = self.config.player_capacity;
        self.register_holder(name, capacity, true)
    }

    /// Register a villager's pool with the configured capacity.
    pub fn register_villager(&mut self, name: impl Into<String>) -> HolderId {
        let holder = PowerHolder::new(name.into(), self.config.villager_capacity, false);
        let id = holder.id();
        self.holders.insert(id, holder);
        id
    }

    /// Unregister an empty holder.
    ///
    /// # Errors
    ///
    /// Returns [`PowerError::UnknownHolder`] or
    /// [`PowerError::HolderNotEmpty`] if it still holds power.
    pub fn remove_holder(&mut self, id: HolderId) -> Result<(), PowerError> {
        let holder = self.holders.get(&id).ok_or(PowerError::UnknownHolder(id))?;
        if holder.current() > 0 {
            return Err(PowerError::HolderNotEmpty {
                holder: id,
                remaining: holder.current(),
            });
        }
        self.holders.remove(&id);
        if self.player == Some(id) {
            self.player = None;
        }
        Ok(())
    }

    /// Look up a holder.
    pub fn holder(&self, id: HolderId) -> Option<&PowerHolder> {
        self.holders.get(&id)
    }

    /// Iterate over all holders in registration order.
    pub fn holders(&self) -> impl Iterator<Item = &PowerHolder> {
        self.holders.values()
    }

    /// The player's pool, if registered.
    pub fn player(&self) -> Option<&PowerHolder> {
        self.player.and_then(|id| self.holders.get(&id))
    }

    /// Power in the communal pool.
    pub const fn communal_power(&self) -> u32 {
        self.communal
    }

    /// Power lying in uncollected drops.
    pub fn dropped_power(&self) -> u32 {
        self.drops
            .values()
            .fold(0_u32, |acc, d| acc.saturating_add(d.amount))
    }

    /// Look up a drop.
    pub fn drop_site(&self, id: DropId) -> Option<&PowerDrop> {
        self.drops.get(&id)
    }

    /// All power in the economy: communal, held, and dropped.
    pub fn total_in_circulation(&self) -> u32 {
        self.holders
            .values()
            .fold(self.communal, |acc, h| acc.saturating_add(h.current()))
            .saturating_add(self.dropped_power())
    }

    /// The append-only movement log.
    pub const fn ledger(&self) -> &PowerLedger {
        &self.ledger
    }

    // -----------------------------------------------------------------------
    // Transfers
    // -----------------------------------------------------------------------

    /// Add newly generated power to the communal pool.
    ///
    /// # Errors
    ///
    /// Returns [`PowerError::ZeroAmount`] when `amount` is 0.
    pub fn generate(&mut self, amount: u32) -> Result<u32, PowerError> {
        if amount == 0 {
            return Err(PowerError::ZeroAmount);
        }
        let accepted = amount.min(u32::MAX.saturating_sub(self.communal));
        if accepted == 0 {
            return Err(PowerError::Overflow);
        }
        self.ledger.record(
            PowerEntryType::Generate,
            PowerAccount::Source,
            PowerAccount::Communal,
            accepted,
        )?;
        self.communal = self.communal.saturating_add(accepted);
        Ok(accepted)
    }

    /// Move up to `amount` from the communal pool to the player.
    ///
    /// The amount is clamped to what the pool holds and to the player's
    /// free capacity.
    ///
    /// # Errors
    ///
    /// [`PowerError::NoPlayer`], [`PowerError::ZeroAmount`],
    /// [`PowerError::InsufficientPower`] when the pool is empty, or
    /// [`PowerError::HolderFull`] when the player is at capacity.
    pub fn transfer_power_to_player(&mut self, amount: u32) -> Result<u32, PowerError> {
        let player = self.player.ok_or(PowerError::NoPlayer)?;
        self.allocate_to_holder(player, amount)
    }

    /// Move up to `amount` from the player back to the communal pool.
    ///
    /// # Errors
    ///
    /// [`PowerError::NoPlayer`], [`PowerError::ZeroAmount`], or
    /// [`PowerError::InsufficientPower`] when the player holds nothing.
    pub fn return_power_to_communal(&mut self, amount: u32) -> Result<u32, PowerError> {
        let player = self.player.ok_or(PowerError::NoPlayer)?;
        self.reclaim_from_holder(player, amount)
    }

    /// Move up to `amount` from the communal pool to a holder.
    ///
    /// # Errors
    ///
    /// [`PowerError::ZeroAmount`], [`PowerError::UnknownHolder`],
    /// [`PowerError::InsufficientPower`], or [`PowerError::HolderFull`].
    pub fn allocate_to_holder(&mut self, to: HolderId, amount: u32) -> Result<u32, PowerError> {
        if amount == 0 {
            return Err(PowerError::ZeroAmount);
        }
        let holder = self.holders.get(&to).ok_or(PowerError::UnknownHolder(to))?;
        if self.communal == 0 {
            return Err(PowerError::InsufficientPower {
                requested: amount,
                available: 0,
            });
        }
        if holder.is_full() {
            return Err(PowerError::HolderFull { holder: to });
        }

        let moved = amount.min(self.communal).min(holder.free_capacity());
        self.ledger.record(
            PowerEntryType::Allocate,
            PowerAccount::Communal,
            PowerAccount::Holder(to),
            moved,
        )?;
        self.communal = self.communal.saturating_sub(moved);
        if let Some(holder) = self.holders.get_mut(&to) {
            holder.credit(moved);
        }
        debug!(holder = %to, requested = amount, moved, communal = self.communal, "Power allocated");
        Ok(moved)
    }

    /// Move up to `amount` from a holder back to the communal pool.
    ///
    /// # Errors
    ///
    /// [`PowerError::ZeroAmount`], [`PowerError::UnknownHolder`], or
    /// [`PowerError::InsufficientPower`] when the holder is empty.
    pub fn reclaim_from_holder(&mut self, from: HolderId, amount: u32) -> Result<u32, PowerError> {
        if amount == 0 {
            return Err(PowerError::ZeroAmount);
        }
        let holder = self
            .holders
            .get_mut(&from)
            .ok_or(PowerError::UnknownHolder(from))?;
        if holder.current() == 0 {
            return Err(PowerError::InsufficientPower {
                requested: amount,
                available: 0,
            });
        }

        let moved = amount
            .min(holder.current())
            .min(u32::MAX.saturating_sub(self.communal));
        self.ledger.record(
            PowerEntryType::Reclaim,
            PowerAccount::Holder(from),
            PowerAccount::Communal,
            moved,
        )?;
        holder.debit(moved);
        self.communal = self.communal.saturating_add(moved);
        debug!(holder = %from, requested = amount, moved, communal = self.communal, "Power reclaimed");
        Ok(moved)
    }

    /// Move up to `amount` directly between two holders.
    ///
    /// # Errors
    ///
    /// [`PowerError::ZeroAmount`], [`PowerError::SameHolder`],
    /// [`PowerError::UnknownHolder`], [`PowerError::InsufficientPower`], or
    /// [`PowerError::HolderFull`].
    pub fn transfer_between(
        &mut self,
        from: HolderId,
        to: HolderId,
        amount: u32,
    ) -> Result<u32, PowerError> {
        if amount == 0 {
            return Err(PowerError::ZeroAmount);
        }
        if from == to {
            return Err(PowerError::SameHolder);
        }
        let available = self
            .holders
            .get(&from)
            .ok_or(PowerError::UnknownHolder(from))?
            .current();
        let room = self
            .holders
            .get(&to)
            .ok_or(PowerError::UnknownHolder(to))?
            .free_capacity();
        if available == 0 {
            return Err(PowerError::InsufficientPower {
                requested: amount,
                available,
            });
        }
        if room == 0 {
            return Err(PowerError::HolderFull { holder: to });
        }

        let moved = amount.min(available).min(room);
        self.ledger.record(
            PowerEntryType::Transfer,
            PowerAccount::Holder(from),
            PowerAccount::Holder(to),
            moved,
        )?;
        if let Some(source) = self.holders.get_mut(&from) {
            source.debit(moved);
        }
        if let Some(dest) = self.holders.get_mut(&to) {
            dest.credit(moved);
        }
        Ok(moved)
    }

    /// Spread the communal pool across non-player holders.
    ///
    /// Hands out one unit at a time, round-robin in registration order,
    /// skipping full holders, until the pool is empty or every holder is
    /// full. Returns the amount each holder received.
    pub fn auto_distribute(&mut self) -> BTreeMap<HolderId, u32> {
        let mut given: BTreeMap<HolderId, u32> = BTreeMap::new();
        let recipients: Vec<HolderId> = self
            .holders
            .values()
            .filter(|h| !h.is_player())
            .map(PowerHolder::id)
            .collect();

        let mut progress = true;
        while self.communal > 0 && progress {
            progress = false;
            for id in &recipients {
                if self.communal == 0 {
                    break;
                }
                let Some(holder) = self.holders.get_mut(id) else {
                    continue;
                };
                if holder.credit(1) == 1 {
                    self.communal = self.communal.saturating_sub(1);
                    let slot = given.entry(*id).or_insert(0);
                    *slot = slot.saturating_add(1);
                    progress = true;
                }
            }
        }

        for (id, amount) in &given {
            // Amounts are non-zero and accounts are well-formed.
            let _ = self.ledger.record(
                PowerEntryType::Allocate,
                PowerAccount::Communal,
                PowerAccount::Holder(*id),
                *amount,
            );
        }

        info!(
            recipients = given.len(),
            distributed = given.values().sum::<u32>(),
            communal = self.communal,
            "Communal power auto-distributed"
        );
        given
    }

    // -----------------------------------------------------------------------
    // Drops
    // -----------------------------------------------------------------------

    /// Empty a holder onto the ground.
    ///
    /// Returns `Ok(None)` when the holder held nothing.
    ///
    /// # Errors
    ///
    /// [`PowerError::UnknownHolder`].
    pub fn drop_power(&mut self, from: HolderId) -> Result<Option<(DropId, u32)>, PowerError> {
        let holder = self
            .holders
            .get_mut(&from)
            .ok_or(PowerError::UnknownHolder(from))?;
        let amount = holder.current();
        if amount == 0 {
            return Ok(None);
        }

        let drop_id = DropId::new();
        self.ledger.record(
            PowerEntryType::Drop,
            PowerAccount::Holder(from),
            PowerAccount::Ground(drop_id),
            amount,
        )?;
        holder.debit(amount);
        self.drops.insert(
            drop_id,
            PowerDrop {
                amount,
                age_seconds: 0.0,
            },
        );
        info!(holder = %from, drop = %drop_id, amount, "Power dropped");
        Ok(Some((drop_id, amount)))
    }

    /// Pick up as much of a drop as `to` can hold.
    ///
    /// The remainder stays on the ground. An emptied drop is removed.
    ///
    /// # Errors
    ///
    /// [`PowerError::UnknownDrop`], [`PowerError::UnknownHolder`], or
    /// [`PowerError::HolderFull`].
    pub fn collect_drop(&mut self, drop_id: DropId, to: HolderId) -> Result<u32, PowerError> {
        let available = self
            .drops
            .get(&drop_id)
            .ok_or(PowerError::UnknownDrop(drop_id))?
            .amount;
        let room = self
            .holders
            .get(&to)
            .ok_or(PowerError::UnknownHolder(to))?
            .free_capacity();
        if room == 0 {
            return Err(PowerError::HolderFull { holder: to });
        }

        let moved = available.min(room);
        self.ledger.record(
            PowerEntryType::Pickup,
            PowerAccount::Ground(drop_id),
            PowerAccount::Holder(to),
            moved,
        )?;
        if let Some(holder) = self.holders.get_mut(&to) {
            holder.credit(moved);
        }
        let emptied = self.drops.get_mut(&drop_id).is_some_and(|d| {
            d.amount = d.amount.saturating_sub(moved);
            d.amount == 0
        });
        if emptied {
            self.drops.remove(&drop_id);
        }
        Ok(moved)
    }

    /// Age every drop by `dt` seconds and return expired ones to the
    /// communal pool. Returns the expired drops and their amounts.
    pub fn expire_drops(&mut self, dt: f32) -> Vec<(DropId, u32)> {
        let lifetime = self.config.drop_lifetime_seconds;
        let mut expired = Vec::new();
        for (id, drop) in &mut self.drops {
            drop.age_seconds += dt;
            if drop.age_seconds >= lifetime {
                expired.push((*id, drop.amount));
            }
        }

        for (id, amount) in &expired {
            self.drops.remove(id);
            if self
                .ledger
                .record(
                    PowerEntryType::Expire,
                    PowerAccount::Ground(*id),
                    PowerAccount::Communal,
                    *amount,
                )
                .is_ok()
            {
                self.communal = self.communal.saturating_add(*amount);
            } else {
                warn!(drop = %id, amount, "Expired drop could not be recorded");
            }
        }
        expired
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    /// Player share of all power in circulation.
    pub fn greed_score(&self) -> f32 {
        let player_power = self.player().map_or(0, PowerHolder::current);
        scoring::greed_score(player_power, self.total_in_circulation())
    }

    /// Rebellion pressure on one holder; 0 for unknown holders.
    pub fn rebellion_risk(&self, holder: HolderId) -> f32 {
        self.holders.get(&holder).map_or(0.0, |h| {
            scoring::rebellion_risk(
                self.greed_score(),
                self.config.greed_threshold,
                h.fill_ratio(),
            )
        })
    }

    // -----------------------------------------------------------------------
    // Integrity
    // -----------------------------------------------------------------------

    /// Replay the ledger and compare against live balances.
    pub fn verify_conservation(&self) -> ConservationResult {
        let mut live = BTreeMap::new();
        live.insert(PowerAccount::Communal, self.communal);
        for holder in self.holders.values() {
            live.insert(PowerAccount::Holder(holder.id()), holder.current());
        }
        for (id, drop) in &self.drops {
            live.insert(PowerAccount::Ground(*id), drop.amount);
        }
        let result = conservation::verify_conservation(self.ledger.entries(), &live);
        if let ConservationResult::Anomaly(anomaly) = &result {
            warn!(%anomaly, "Power conservation violated");
        }
        result
    }

    /// Read-only copy for the UI.
    pub fn snapshot(&self) -> EconomySnapshot {
        EconomySnapshot {
            communal_power: self.communal,
            dropped_power: self.dropped_power(),
            greed: self.greed_score(),
            holders: self.holders.values().map(PowerHolder::snapshot).collect(),
        }
    }
}
