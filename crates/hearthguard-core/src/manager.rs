//! The village roster and the rules no single villager can evaluate alone.
//!
//! [`VillageManager`] owns every living villager and the
//! [`CaptainInfluenceSystem`]. It runs the cascade rebellion rules, the
//! nightly food distribution and recovery, and the greed penalty.
//!
//! # Cascade rules
//!
//! [`VillageManager::on_villager_rebelled`] is called synchronously, inside
//! the frame, each time a villager commits to rebellion:
//!
//! 1. **Captain cascade.** If the rebel is a captain, every loyal commoner
//!    at or above `captain_cascade_threshold` is forced to maximum
//!    discontent.
//! 2. **Mass rebellion.** If the rebel count reaches `mass_min_rebels`, or
//!    the rebel share of the roster reaches `mass_min_fraction`, every
//!    loyal villager at or above `mass_threshold` is forced to maximum
//!    discontent.
//!
//! Membership is evaluated once per committed rebellion. Forced villagers
//! only start their telegraph here; each commits on a later frame and
//! triggers its own evaluation then. A villager rebels at most once, so
//! the chain always terminates.

use std::collections::BTreeMap;

use glam::Vec2;
use hearthguard_power::{PowerEconomy, PowerHolder};
use hearthguard_types::{EntityId, Role, SimEvent, VillagerState};
use hearthguard_villagers::{
    CaptainInfluenceSystem, Damageable, InfluenceConfig, Villager, VillagerError,
};
use tracing::{debug, info};

use crate::config::{CascadeConfig, FoodConfig};

/// Owns the roster.
#[derive(Debug)]
pub struct VillageManager {
    cascade: CascadeConfig,
    food: FoodConfig,
    roster: BTreeMap<EntityId, Villager>,
    influence: CaptainInfluenceSystem,
}

impl VillageManager {
    /// An empty village.
    pub const fn new(cascade: CascadeConfig, food: FoodConfig, influence: InfluenceConfig) -> Self {
        Self {
            cascade,
            food,
            roster: BTreeMap::new(),
            influence: CaptainInfluenceSystem::new(influence),
        }
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Add a villager to the roster.
    ///
    /// # Errors
    ///
    /// Returns [`VillagerError::DuplicateVillager`] if the ID is taken.
    pub fn add_villager(&mut self, villager: Villager) -> Result<EntityId, VillagerError> {
        let id = villager.id();
        if self.roster.contains_key(&id) {
            return Err(VillagerError::DuplicateVillager(id));
        }
        debug!(villager = %id, name = villager.name(), role = %villager.role(), "Villager joined the roster");
        self.roster.insert(id, villager);
        Ok(id)
    }

    /// Take a villager off the roster. Influence drops it on the next
    /// pass.
    pub fn remove_villager(&mut self, id: EntityId) -> Option<Villager> {
        let removed = self.roster.remove(&id);
        if removed.is_some() {
            debug!(villager = %id, remaining = self.roster.len(), "Villager left the roster");
        }
        removed
    }

    /// A villager by ID.
    pub fn get(&self, id: EntityId) -> Option<&Villager> {
        self.roster.get(&id)
    }

    /// A villager by ID, mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Villager> {
        self.roster.get_mut(&id)
    }

    /// Every villager, in ID (creation) order.
    pub fn villagers(&self) -> impl Iterator<Item = &Villager> {
        self.roster.values()
    }

    /// Every villager ID, in creation order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.roster.keys().copied().collect()
    }

    /// Roster size.
    pub fn len(&self) -> usize {
        self.roster.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Committed rebels.
    pub fn rebel_count(&self) -> usize {
        self.roster
            .values()
            .filter(|v| v.state() == VillagerState::Rebel)
            .count()
    }

    /// Villagers still on the village's side.
    pub fn loyal_count(&self) -> usize {
        self.roster.values().filter(|v| v.is_loyal()).count()
    }

    /// The captain influence system.
    pub const fn influence(&self) -> &CaptainInfluenceSystem {
        &self.influence
    }

    /// Run the influence system for `dt` seconds.
    pub fn tick_influence(&mut self, dt: f32) -> Vec<SimEvent> {
        self.influence.tick(dt, &mut self.roster)
    }

    /// Mirror every holder's power into its villager.
    pub fn sync_power(&mut self, economy: &PowerEconomy) {
        for villager in self.roster.values_mut() {
            let power = economy
                .holder(villager.holder())
                .map_or(0, PowerHolder::current);
            villager.set_power(power);
        }
    }

    // -----------------------------------------------------------------------
    // Cascades
    // -----------------------------------------------------------------------

    /// Evaluate the cascade rules after `rebel` committed to rebellion.
    ///
    /// Returns the batched cascade notifications followed by the forced
    /// villagers' own events. Nothing is returned when no one was forced.
    pub fn on_villager_rebelled(&mut self, rebel: EntityId) -> Vec<SimEvent> {
        let mut events = Vec::new();
        let Some(villager) = self.roster.get(&rebel) else {
            return events;
        };
        if villager.state() != VillagerState::Rebel {
            return events;
        }

        if villager.role() == Role::Captain {
            let threshold = self.cascade.captain_cascade_threshold;
            let forced = self.cascade_candidates(|v| {
                v.role() == Role::Commoner && v.discontent() >= threshold
            });
            if !forced.is_empty() {
                info!(captain = %rebel, forced = forced.len(), "Captain cascade");
                events.push(SimEvent::CaptainCascade {
                    captain: rebel,
                    forced: forced.clone(),
                });
                self.force_all(&forced, &mut events);
            }
        }

        let rebel_count = self.rebel_count();
        let roster_size = self.roster.len();
        if self.mass_rebellion_triggered(rebel_count, roster_size) {
            let threshold = self.cascade.mass_threshold;
            let forced = self.cascade_candidates(|v| v.discontent() >= threshold);
            if !forced.is_empty() {
                info!(
                    trigger = %rebel,
                    rebel_count,
                    roster_size,
                    forced = forced.len(),
                    "Mass rebellion"
                );
                events.push(SimEvent::MassRebellion {
                    trigger: rebel,
                    rebel_count: u32::try_from(rebel_count).unwrap_or(u32::MAX),
                    roster_size: u32::try_from(roster_size).unwrap_or(u32::MAX),
                    forced: forced.clone(),
                });
                self.force_all(&forced, &mut events);
            }
        }
        events
    }

    /// Whether `rebel_count` rebels out of `roster_size` cross either
    /// mass-rebellion threshold.
    pub fn mass_rebellion_triggered(&self, rebel_count: usize, roster_size: usize) -> bool {
        if rebel_count == 0 || roster_size == 0 {
            return false;
        }
        let by_count = u32::try_from(rebel_count).unwrap_or(u32::MAX) >= self.cascade.mass_min_rebels;
        #[allow(clippy::cast_precision_loss, reason = "roster sizes stay far below 2^24")]
        let fraction = rebel_count as f32 / roster_size as f32;
        let by_fraction = fraction >= self.cascade.mass_min_fraction;
        by_count || by_fraction
    }

    /// Loyal or Angry villagers whose telegraph has not started and that
    /// match `filter`, in ID order.
    fn cascade_candidates(&self, filter: impl Fn(&Villager) -> bool) -> Vec<EntityId> {
        self.roster
            .values()
            .filter(|v| v.is_loyal() && !v.is_rebellion_pending() && !v.health().is_dead())
            .filter(|&v| filter(v))
            .map(Villager::id)
            .collect()
    }

    fn force_all(&mut self, ids: &[EntityId], events: &mut Vec<SimEvent>) {
        for id in ids {
            if let Some(villager) = self.roster.get_mut(id) {
                events.extend(villager.force_max_discontent());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Food
    // -----------------------------------------------------------------------

    /// Food produced by every loyal, active farmer tonight.
    ///
    /// Each farmer yields `production_per_farmer`, raised by
    /// `production_bonus_per_tier` per tier.
    pub fn nightly_production(&self) -> f32 {
        self.roster
            .values()
            .filter(|v| v.role() == Role::Farmer && v.is_loyal() && v.stats().is_active())
            .map(|v| {
                let tier = v.stats().tier().factor();
                self.food.production_per_farmer * (1.0 + self.food.production_bonus_per_tier * tier)
            })
            .sum()
    }

    /// Split tonight's production evenly across the living roster.
    ///
    /// Rebels still eat; only loyal farmers produce.
    pub fn distribute_food(&mut self) -> Option<SimEvent> {
        let production = self.nightly_production();
        let (share, recipients) = self.feed_living(production)?;
        info!(production, share, recipients, "Food distributed");
        Some(SimEvent::FoodDistributed {
            production,
            share,
            recipients,
        })
    }

    /// Split a dead villager's remaining food across the survivors.
    pub fn redistribute_after_death(&mut self, freed_food: f32) -> Option<SimEvent> {
        if freed_food.is_nan() || freed_food <= 0.0 {
            return None;
        }
        let (share, recipients) = self.feed_living(freed_food)?;
        debug!(freed_food, share, recipients, "Food redistributed");
        Some(SimEvent::FoodRedistributed { share, recipients })
    }

    fn feed_living(&mut self, total: f32) -> Option<(f32, u32)> {
        let recipients: Vec<&mut Villager> = self
            .roster
            .values_mut()
            .filter(|v| !v.health().is_dead())
            .collect();
        if recipients.is_empty() {
            return None;
        }
        let count = u32::try_from(recipients.len()).unwrap_or(u32::MAX);
        #[allow(clippy::cast_precision_loss, reason = "roster sizes stay far below 2^24")]
        let share = total / count as f32;
        for villager in recipients {
            villager.feed(share);
        }
        Some((share, count))
    }

    // -----------------------------------------------------------------------
    // Nightly morale
    // -----------------------------------------------------------------------

    /// Once-per-night recovery for every fed villager.
    pub fn apply_nightly_recovery(&mut self) -> Vec<SimEvent> {
        self.roster
            .values_mut()
            .flat_map(Villager::apply_nightly_recovery)
            .collect()
    }

    /// Nightly resentment of the player's greed, scaled per villager by
    /// its rebellion risk.
    pub fn apply_greed_penalty(&mut self, economy: &PowerEconomy) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for villager in self.roster.values_mut().filter(|v| v.is_loyal()) {
            let risk = economy.rebellion_risk(villager.holder());
            events.extend(villager.apply_greed_penalty(risk));
        }
        events
    }

    // -----------------------------------------------------------------------
    // Life events
    // -----------------------------------------------------------------------

    /// Residents of a building that just fell: they go inactive and
    /// resent it. Returns the displaced residents and their events.
    pub fn on_building_destroyed(&mut self, building: EntityId) -> (Vec<EntityId>, Vec<SimEvent>) {
        let mut displaced = Vec::new();
        let mut events = Vec::new();
        for villager in self
            .roster
            .values_mut()
            .filter(|v| v.building() == Some(building))
        {
            displaced.push(villager.id());
            events.extend(villager.on_building_destroyed());
        }
        (displaced, events)
    }

    /// Loyal villagers within `radius` of `position`, nearest first.
    pub fn loyal_within(&self, position: Vec2, radius: f32) -> Vec<EntityId> {
        let mut found: Vec<(f32, EntityId)> = self
            .roster
            .values()
            .filter(|v| v.is_loyal() && !v.health().is_dead())
            .map(|v| (v.position().distance(position), v.id()))
            .filter(|(distance, _)| *distance <= radius)
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearthguard_types::HolderId;
    use hearthguard_villagers::SpatialIndex;

    use super::*;

    fn manager() -> VillageManager {
        VillageManager::new(
            CascadeConfig::default(),
            FoodConfig::default(),
            InfluenceConfig::default(),
        )
    }

    fn villager(role: Role, discontent: f32) -> Villager {
        Villager::builder("Villager", role)
            .holder(HolderId::new())
            .discontent(discontent)
            .build()
            .unwrap()
    }

    /// Force a villager all the way into Rebel and tell the manager.
    fn rebel(manager: &mut VillageManager, id: EntityId) -> Vec<SimEvent> {
        let villager = manager.get_mut(id).unwrap();
        let _ = villager.force_max_discontent();
        let out = villager.tick(1.0, &SpatialIndex::new());
        assert!(out.rebelled);
        manager.on_villager_rebelled(id)
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut manager = manager();
        let v = villager(Role::Commoner, 0.0);
        let id = v.id();
        assert!(manager.add_villager(v).is_ok());
        let twin = Villager::builder("Twin", Role::Commoner)
            .id(id)
            .holder(HolderId::new())
            .build()
            .unwrap();
        assert!(matches!(
            manager.add_villager(twin),
            Err(VillagerError::DuplicateVillager(dup)) if dup == id
        ));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn captain_cascade_forces_disgruntled_commoners() {
        let mut manager = manager();
        let captain = manager.add_villager(villager(Role::Captain, 0.0)).unwrap();
        let hot = manager.add_villager(villager(Role::Commoner, 75.0)).unwrap();
        let cool = manager.add_villager(villager(Role::Commoner, 60.0)).unwrap();
        let farmer = manager.add_villager(villager(Role::Farmer, 90.0)).unwrap();

        let events = rebel(&mut manager, captain);

        assert!(events.contains(&SimEvent::CaptainCascade {
            captain,
            forced: vec![hot],
        }));
        assert!(manager.get(hot).unwrap().is_rebellion_pending());
        assert!(!manager.get(cool).unwrap().is_rebellion_pending());
        assert!(!manager.get(farmer).unwrap().is_rebellion_pending());
    }

    #[test]
    fn commoner_rebellion_is_not_a_captain_cascade() {
        let mut manager = manager();
        let commoner = manager.add_villager(villager(Role::Commoner, 0.0)).unwrap();
        let _ = manager.add_villager(villager(Role::Commoner, 80.0)).unwrap();
        for _ in 0..8 {
            let _ = manager.add_villager(villager(Role::Builder, 0.0));
        }
        let events = rebel(&mut manager, commoner);
        assert!(events.is_empty(), "{events:?}");
    }

    #[test]
    fn mass_thresholds() {
        let manager = manager();
        assert!(!manager.mass_rebellion_triggered(0, 10));
        assert!(!manager.mass_rebellion_triggered(2, 10));
        assert!(manager.mass_rebellion_triggered(3, 10));
        // 2 of 5 is 40%.
        assert!(manager.mass_rebellion_triggered(2, 5));
        assert!(!manager.mass_rebellion_triggered(1, 5));
    }

    #[test]
    fn mass_rebellion_forces_loyal_villagers_over_threshold() {
        let mut manager = manager();
        let first = manager.add_villager(villager(Role::Commoner, 0.0)).unwrap();
        let second = manager.add_villager(villager(Role::Farmer, 0.0)).unwrap();
        let above = manager.add_villager(villager(Role::Mage, 45.0)).unwrap();
        let below = manager.add_villager(villager(Role::Builder, 10.0)).unwrap();

        // 1 of 4 is under both thresholds.
        assert!(rebel(&mut manager, first).is_empty());
        // 2 of 4 is 50%.
        let events = rebel(&mut manager, second);

        assert_eq!(
            events.first(),
            Some(&SimEvent::MassRebellion {
                trigger: second,
                rebel_count: 2,
                roster_size: 4,
                forced: vec![above],
            })
        );
        assert!(manager.get(above).unwrap().is_rebellion_pending());
        assert!(!manager.get(below).unwrap().is_rebellion_pending());
    }

    #[test]
    fn already_pending_villagers_are_not_forced_twice() {
        let mut manager = manager();
        let captain = manager.add_villager(villager(Role::Captain, 0.0)).unwrap();
        let hot = manager.add_villager(villager(Role::Commoner, 90.0)).unwrap();
        let _ = manager.add_villager(villager(Role::Commoner, 10.0)).unwrap();

        // 1 of 3 is 33%, so only the captain cascade fires here.
        let events = rebel(&mut manager, captain);
        let cascades = events
            .iter()
            .filter(|e| matches!(e, SimEvent::CaptainCascade { .. } | SimEvent::MassRebellion { .. }))
            .count();
        assert_eq!(cascades, 1);
        assert!(manager.get(hot).unwrap().is_rebellion_pending());
    }

    #[test]
    fn food_is_split_across_the_living_roster() {
        let mut manager = manager();
        let farmer = manager.add_villager(villager(Role::Farmer, 0.0)).unwrap();
        let commoner = manager.add_villager(villager(Role::Commoner, 0.0)).unwrap();
        let turncoat = manager.add_villager(villager(Role::Commoner, 0.0)).unwrap();
        let _ = rebel(&mut manager, turncoat);

        for id in [farmer, commoner, turncoat] {
            let _ = manager.get_mut(id).unwrap().feed(-1.0);
        }

        let event = manager.distribute_food();
        assert_eq!(
            event,
            Some(SimEvent::FoodDistributed {
                production: 2.0,
                share: 2.0 / 3.0,
                recipients: 3,
            })
        );
        for id in [farmer, commoner, turncoat] {
            assert!((manager.get(id).unwrap().stats().food() - 2.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn rebel_farmers_eat_but_do_not_produce() {
        let mut manager = manager();
        let loyal = manager.add_villager(villager(Role::Farmer, 0.0)).unwrap();
        let turncoat = manager.add_villager(villager(Role::Farmer, 0.0)).unwrap();
        let _ = rebel(&mut manager, turncoat);
        assert!((manager.nightly_production() - 2.0).abs() < 1e-6);

        for id in [loyal, turncoat] {
            let _ = manager.get_mut(id).unwrap().feed(-1.0);
        }
        let event = manager.redistribute_after_death(1.0);
        assert_eq!(
            event,
            Some(SimEvent::FoodRedistributed {
                share: 0.5,
                recipients: 2,
            })
        );
        assert!((manager.get(turncoat).unwrap().stats().food() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn farmer_tier_raises_production() {
        let mut manager = manager();
        let farmer = manager.add_villager(villager(Role::Farmer, 0.0)).unwrap();
        manager.get_mut(farmer).unwrap().set_power(4);
        // 2.0 * (1 + 0.5 * 2)
        assert!((manager.nightly_production() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn death_redistributes_food() {
        let mut manager = manager();
        let a = manager.add_villager(villager(Role::Commoner, 0.0)).unwrap();
        let b = manager.add_villager(villager(Role::Commoner, 0.0)).unwrap();
        for id in [a, b] {
            let _ = manager.get_mut(id).unwrap().feed(-1.0);
        }
        assert_eq!(manager.redistribute_after_death(0.0), None);
        let event = manager.redistribute_after_death(0.5);
        assert_eq!(
            event,
            Some(SimEvent::FoodRedistributed {
                share: 0.25,
                recipients: 2,
            })
        );
    }

    #[test]
    fn building_loss_displaces_residents() {
        let mut manager = manager();
        let home = EntityId::new();
        let resident = manager
            .add_villager(
                Villager::builder("Resident", Role::Builder)
                    .holder(HolderId::new())
                    .building(home)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let other = manager.add_villager(villager(Role::Builder, 0.0)).unwrap();

        let (displaced, _) = manager.on_building_destroyed(home);
        assert_eq!(displaced, vec![resident]);
        assert!(!manager.get(resident).unwrap().stats().is_active());
        assert!((manager.get(resident).unwrap().discontent() - 20.0).abs() < 1e-4);
        assert!(manager.get(other).unwrap().stats().is_active());
    }

    #[test]
    fn greed_penalty_scales_with_risk() {
        let mut economy = PowerEconomy::new(hearthguard_power::PowerConfig {
            communal_start: 10,
            ..hearthguard_power::PowerConfig::default()
        });
        let _ = economy.register_player("Warden").unwrap();
        let holder = economy.register_villager("Wren");
        let _ = economy.transfer_power_to_player(10).unwrap();

        let mut manager = manager();
        let id = manager
            .add_villager(
                Villager::builder("Wren", Role::Commoner)
                    .holder(holder)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        // greed 1.0, empty pool: full risk.
        let _ = manager.apply_greed_penalty(&economy);
        assert!((manager.get(id).unwrap().discontent() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn counts_and_witnesses() {
        let mut manager = manager();
        let near = manager
            .add_villager(
                Villager::builder("Near", Role::Commoner)
                    .holder(HolderId::new())
                    .position(Vec2::new(2.0, 0.0))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let _far = manager
            .add_villager(
                Villager::builder("Far", Role::Commoner)
                    .holder(HolderId::new())
                    .position(Vec2::new(20.0, 0.0))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(manager.loyal_within(Vec2::ZERO, 6.0), vec![near]);
        assert_eq!(manager.loyal_count(), 2);
        assert_eq!(manager.rebel_count(), 0);

        let victim = manager.get_mut(near).unwrap();
        let _ = victim.take_damage(1000.0, None);
        assert!(manager.loyal_within(Vec2::ZERO, 6.0).is_empty());
    }
}
