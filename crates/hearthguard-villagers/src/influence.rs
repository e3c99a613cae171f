//! Captain auras and honor guards.
//!
//! [`CaptainInfluenceSystem`] runs on its own low-frequency cadence (5 Hz
//! by default), separate from the combat frame. Each pass re-derives aura
//! membership from scratch:
//!
//! - A commoner is influenced by at most one captain. When auras overlap,
//!   the nearest captain wins, and equal distances go to the lower ID.
//! - Commoners entering an aura receive the captain's bonus bundle;
//!   commoners leaving it (or dying, or rebelling) lose it.
//! - Each captain makes at most one honor-guard adjustment per pass:
//!   evict the furthest follower when over the bound, or promote the
//!   nearest influenced non-follower when under it.
//! - When the follower set changes, followers are given evenly spaced
//!   points on a ring around the captain. Followers busy fighting keep
//!   their chase.

use std::collections::{BTreeMap, BTreeSet};
use std::f32::consts::TAU;

use glam::Vec2;
use hearthguard_types::{EntityId, Role, SimEvent, Tier, VillagerState};
use tracing::debug;

use crate::config::InfluenceConfig;
use crate::health::Damageable;
use crate::villager::Villager;

/// Slack on the pass accumulator so float drift never drops a pass.
const PASS_EPSILON: f32 = 1e-4;

/// The four bonuses a captain grants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfluenceBonus {
    /// Fractional damage boost.
    pub damage_boost: f32,
    /// Fractional walking speed boost.
    pub speed_boost: f32,
    /// Fractional incoming damage reduction.
    pub damage_reduction: f32,
    /// Fractional cooldown reduction.
    pub cooldown_reduction: f32,
}

/// The bonus bundle of a captain at `tier`.
pub fn bonus_for_tier(config: &InfluenceConfig, tier: Tier) -> InfluenceBonus {
    InfluenceBonus {
        damage_boost: config.damage_boost.at(tier),
        speed_boost: config.speed_boost.at(tier),
        damage_reduction: config.damage_reduction.at(tier),
        cooldown_reduction: config.cooldown_reduction.at(tier),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CaptainState {
    influenced: BTreeSet<EntityId>,
    followers: Vec<EntityId>,
}

/// A captain taking part in a pass.
#[derive(Debug, Clone, Copy)]
struct ActiveCaptain {
    id: EntityId,
    position: Vec2,
    tier: Tier,
}

/// Periodic aura and honor-guard bookkeeping for every captain.
#[derive(Debug, Clone)]
pub struct CaptainInfluenceSystem {
    config: InfluenceConfig,
    accumulator: f32,
    captains: BTreeMap<EntityId, CaptainState>,
}

impl CaptainInfluenceSystem {
    /// A system with no captains tracked yet.
    pub const fn new(config: InfluenceConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            captains: BTreeMap::new(),
        }
    }

    /// Aura radius at `tier`.
    pub fn radius(&self, tier: Tier) -> f32 {
        self.config.radius.at(tier)
    }

    /// Honor-guard size at `tier`.
    pub fn max_followers(&self, tier: Tier) -> usize {
        let bound = self
            .config
            .followers_per_tier
            .saturating_mul(u32::from(tier.level()))
            .saturating_add(self.config.base_followers);
        usize::try_from(bound).unwrap_or(usize::MAX)
    }

    /// Bonus bundle at `tier`.
    pub fn bonus_for_tier(&self, tier: Tier) -> InfluenceBonus {
        bonus_for_tier(&self.config, tier)
    }

    /// Current honor guard of `captain`, in promotion order.
    pub fn followers_of(&self, captain: EntityId) -> &[EntityId] {
        self.captains
            .get(&captain)
            .map_or(&[], |state| state.followers.as_slice())
    }

    /// Commoners currently inside `captain`'s aura.
    pub fn influenced_by(&self, captain: EntityId) -> Vec<EntityId> {
        self.captains
            .get(&captain)
            .map(|state| state.influenced.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The captain currently influencing `commoner`.
    pub fn captain_of(&self, commoner: EntityId) -> Option<EntityId> {
        self.captains
            .iter()
            .find(|(_, state)| state.influenced.contains(&commoner))
            .map(|(captain, _)| *captain)
    }

    /// Advance by `dt` seconds, running a pass each time the interval
    /// elapses.
    #[allow(clippy::while_float, reason = "each iteration subtracts a positive interval")]
    pub fn tick(&mut self, dt: f32, roster: &mut BTreeMap<EntityId, Villager>) -> Vec<SimEvent> {
        let interval = self.config.tick_interval_seconds;
        let mut events = Vec::new();
        if interval <= 0.0 {
            return events;
        }
        self.accumulator += dt.max(0.0);
        while self.accumulator + PASS_EPSILON >= interval {
            self.accumulator -= interval;
            events.extend(self.run_pass(roster));
        }
        events
    }

    /// One full re-derivation of auras and honor guards.
    pub fn run_pass(&mut self, roster: &mut BTreeMap<EntityId, Villager>) -> Vec<SimEvent> {
        let mut events = Vec::new();

        let captains: Vec<ActiveCaptain> = roster
            .values()
            .filter(|v| {
                v.role() == Role::Captain && v.state() != VillagerState::Rebel && !v.is_dead()
            })
            .map(|v| ActiveCaptain {
                id: v.id(),
                position: v.position(),
                tier: v.stats().tier(),
            })
            .collect();

        let mut membership: BTreeMap<EntityId, BTreeSet<EntityId>> =
            captains.iter().map(|c| (c.id, BTreeSet::new())).collect();
        for commoner in roster.values().filter(|v| is_eligible(v)) {
            let position = commoner.position();
            let nearest = captains
                .iter()
                .filter_map(|c| {
                    let distance = c.position.distance(position);
                    (distance <= self.radius(c.tier)).then_some((distance, c.id))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            if let Some((_, captain)) = nearest {
                membership
                    .entry(captain)
                    .or_default()
                    .insert(commoner.id());
            }
        }

        // Captains that died or rebelled release everyone.
        let dissolved: Vec<EntityId> = self
            .captains
            .keys()
            .filter(|id| !membership.contains_key(id))
            .copied()
            .collect();
        for captain in dissolved {
            if let Some(state) = self.captains.remove(&captain) {
                for commoner in state.influenced {
                    release(roster, captain, commoner, &mut events);
                }
                debug!(captain = %captain, "Captain aura dissolved");
            }
        }

        for captain in &captains {
            let bonus = self.bonus_for_tier(captain.tier);
            let bound = self.max_followers(captain.tier);
            let ring_radius = self.config.follower_ring_radius;
            let members = membership.remove(&captain.id).unwrap_or_default();
            let state = self.captains.entry(captain.id).or_default();

            for commoner in state.influenced.difference(&members) {
                release(roster, captain.id, *commoner, &mut events);
            }
            for commoner in &members {
                if let Some(villager) = roster.get_mut(commoner) {
                    villager.apply_captain_influence(captain.id, bonus);
                }
                if !state.influenced.contains(commoner) {
                    events.push(SimEvent::InfluenceApplied {
                        captain: captain.id,
                        commoner: *commoner,
                    });
                }
            }
            state.influenced = members;

            adjust_honor_guard(captain, state, bound, ring_radius, roster, &mut events);
        }

        events
    }
}

/// One honor-guard adjustment for `captain`, then re-space the ring when
/// the guard changed.
fn adjust_honor_guard(
    captain: &ActiveCaptain,
    state: &mut CaptainState,
    bound: usize,
    ring_radius: f32,
    roster: &mut BTreeMap<EntityId, Villager>,
    events: &mut Vec<SimEvent>,
) {
    let CaptainState {
        influenced,
        followers,
    } = state;
    let before = followers.clone();
    followers.retain(|f| influenced.contains(f));

    let distance = |id: &EntityId| {
        roster
            .get(id)
            .map_or(f32::MAX, |v| v.position().distance(captain.position))
    };
    if followers.len() > bound {
        let furthest = followers
            .iter()
            .copied()
            .max_by(|a, b| distance(a).total_cmp(&distance(b)).then(a.cmp(b)));
        if let Some(evicted) = furthest {
            followers.retain(|f| *f != evicted);
            debug!(captain = %captain.id, follower = %evicted, "Follower evicted");
            events.push(SimEvent::FollowerEvicted {
                captain: captain.id,
                follower: evicted,
            });
        }
    } else if followers.len() < bound {
        let nearest = influenced
            .iter()
            .copied()
            .filter(|c| !followers.contains(c))
            .min_by(|a, b| distance(a).total_cmp(&distance(b)).then(a.cmp(b)));
        if let Some(promoted) = nearest {
            followers.push(promoted);
            debug!(captain = %captain.id, follower = %promoted, "Follower promoted");
            events.push(SimEvent::FollowerPromoted {
                captain: captain.id,
                follower: promoted,
            });
        }
    }

    if *followers != before {
        let points = ring_points(captain.position, ring_radius, followers.len());
        for (follower, point) in followers.iter().zip(points) {
            if let Some(villager) = roster.get_mut(follower)
                && villager.combat().target().is_none()
            {
                villager.movement_mut().set_destination(point);
            }
        }
    }
}

/// Loyal or Angry commoners that are alive.
fn is_eligible(villager: &Villager) -> bool {
    villager.role() == Role::Commoner
        && villager.state() != VillagerState::Rebel
        && !villager.is_dead()
}

fn release(
    roster: &mut BTreeMap<EntityId, Villager>,
    captain: EntityId,
    commoner: EntityId,
    events: &mut Vec<SimEvent>,
) {
    if let Some(villager) = roster.get_mut(&commoner) {
        villager.remove_captain_influence(captain);
    }
    events.push(SimEvent::InfluenceRemoved { captain, commoner });
}

/// `count` evenly spaced points on a circle around `center`.
#[allow(
    clippy::cast_precision_loss,
    clippy::arithmetic_side_effects,
    reason = "honor guards hold a handful of followers; glam math is f32"
)]
fn ring_points(center: Vec2, radius: f32, count: usize) -> Vec<Vec2> {
    (0..count)
        .map(|i| {
            let angle = TAU * i as f32 / count as f32;
            center + Vec2::from_angle(angle) * radius
        })
        .collect()
}
