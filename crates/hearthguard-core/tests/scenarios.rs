//! End-to-end village scenarios driven through [`Simulation`].
//!
//! Villagers are spread far apart and away from the player so combat
//! never interferes with the rule under test.

#![allow(clippy::unwrap_used, clippy::cast_precision_loss)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use glam::Vec2;
use hearthguard_core::config::{CascadeConfig, ClockConfig, PowerConfig, SimulationConfig};
use hearthguard_core::{EventListener, PowerCommand, Recruit, Simulation};
use hearthguard_types::{EntityId, Faction, Role, SimEvent, VillagerState};
use hearthguard_villagers::Damageable;

const FRAME: f32 = 0.1;

fn simulation() -> Simulation {
    Simulation::new(SimulationConfig::default()).unwrap()
}

fn spot(index: usize) -> Vec2 {
    Vec2::new(50.0 + 20.0 * index as f32, 0.0)
}

fn run(sim: &mut Simulation, frames: u32) {
    for _ in 0..frames {
        sim.tick(FRAME).unwrap();
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<SimEvent>>>);

impl Recorder {
    fn events(&self) -> Vec<SimEvent> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventListener for Recorder {
    fn on_event(&mut self, _frame: u64, event: &SimEvent) {
        if let Ok(mut events) = self.0.lock() {
            events.push(event.clone());
        }
    }
}

#[test]
fn idle_villager_grows_angry_exactly_once() {
    let mut sim = simulation();
    let recorder = Recorder::default();
    sim.register_listener(Box::new(recorder.clone()));
    let id = sim
        .recruit(Recruit::new("Ada", Role::Commoner, spot(0)))
        .unwrap();

    let mut last = 0.0;
    for _ in 0..100 {
        sim.tick(FRAME).unwrap();
        let discontent = sim.village().get(id).unwrap().discontent();
        assert!(discontent > last);
        last = discontent;
    }
    assert!(last < 50.0);
    assert_eq!(sim.village().get(id).unwrap().state(), VillagerState::Loyal);

    run(&mut sim, 500);
    let changes: Vec<_> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            SimEvent::VillagerStateChanged { villager, from, to } if villager == id => {
                Some((from, to))
            }
            _ => None,
        })
        .collect();
    assert_eq!(changes, vec![(VillagerState::Loyal, VillagerState::Angry)]);
}

#[test]
fn maxed_discontent_telegraphs_then_rebels() {
    let mut sim = simulation();
    let id = sim
        .recruit(Recruit::new("Bo", Role::Commoner, spot(0)))
        .unwrap();
    let base_health = sim.village().get(id).unwrap().max_hp();

    sim.add_discontent(id, 1_000.0).unwrap();
    let villager = sim.village().get(id).unwrap();
    assert!((villager.discontent() - 100.0).abs() < f32::EPSILON);
    assert_eq!(villager.state(), VillagerState::Angry);
    assert!(villager.is_rebellion_pending());

    run(&mut sim, 5);
    assert_eq!(sim.village().get(id).unwrap().state(), VillagerState::Angry);

    run(&mut sim, 7);
    let villager = sim.village().get(id).unwrap();
    assert_eq!(villager.state(), VillagerState::Rebel);
    assert_eq!(villager.faction(), Faction::Rebels);
    assert!((villager.max_hp() - base_health * 1.5).abs() < 1e-3);

    sim.add_discontent(id, -100.0).unwrap();
    assert_eq!(sim.village().get(id).unwrap().state(), VillagerState::Rebel);
}

#[test]
fn captain_honor_guard_converges_to_the_nearest_two() {
    let mut sim = simulation();
    let captain_at = Vec2::new(100.0, 0.0);
    let captain = sim
        .recruit(Recruit::new("Cap", Role::Captain, captain_at))
        .unwrap();
    let near = sim
        .recruit(Recruit::new("Near", Role::Commoner, captain_at + Vec2::new(2.0, 0.0)))
        .unwrap();
    let mid = sim
        .recruit(Recruit::new("Mid", Role::Commoner, captain_at + Vec2::new(0.0, 3.0)))
        .unwrap();
    sim.recruit(Recruit::new("Far", Role::Commoner, captain_at + Vec2::new(-4.0, 0.0)))
        .unwrap();

    sim.apply_power_command(PowerCommand::Allocate {
        villager: captain,
        amount: 4,
    })
    .unwrap();
    assert_eq!(sim.village().get(captain).unwrap().stats().tier().level(), 2);

    run(&mut sim, 20);
    let followers: BTreeSet<EntityId> = sim
        .village()
        .influence()
        .followers_of(captain)
        .iter()
        .copied()
        .collect();
    assert_eq!(followers, BTreeSet::from([near, mid]));
}

#[test]
fn take_from_communal_is_clamped_to_the_pool() {
    let config = SimulationConfig {
        power: PowerConfig {
            communal_start: 3,
            ..PowerConfig::default()
        },
        ..SimulationConfig::default()
    };
    let mut sim = Simulation::new(config).unwrap();

    let moved = sim
        .apply_power_command(PowerCommand::TakeFromCommunal(5))
        .unwrap();
    assert_eq!(moved, 3);
    assert_eq!(sim.economy().communal_power(), 0);
    assert_eq!(sim.player_power(), 3);
    assert!(sim.economy().verify_conservation().is_balanced());
}

#[test]
fn third_rebel_triggers_one_batched_mass_rebellion() {
    let config = SimulationConfig {
        cascade: CascadeConfig {
            mass_min_rebels: 3,
            mass_min_fraction: 0.4,
            mass_threshold: 40.0,
            ..CascadeConfig::default()
        },
        ..SimulationConfig::default()
    };
    let mut sim = Simulation::new(config).unwrap();
    let recorder = Recorder::default();
    sim.register_listener(Box::new(recorder.clone()));

    let mut ids = Vec::new();
    for index in 0..10 {
        let discontent = if index < 3 {
            0.0
        } else if index < 6 {
            45.0
        } else {
            10.0
        };
        let id = sim
            .recruit(
                Recruit::new(format!("V{index}"), Role::Commoner, spot(index))
                    .with_discontent(discontent),
            )
            .unwrap();
        ids.push(id);
    }

    for id in ids.iter().take(3) {
        sim.force_max_discontent(*id).unwrap();
    }
    run(&mut sim, 12);

    let masses: Vec<(u32, Vec<EntityId>)> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            SimEvent::MassRebellion {
                rebel_count,
                forced,
                ..
            } => Some((rebel_count, forced)),
            _ => None,
        })
        .collect();
    let expected: Vec<EntityId> = ids.iter().skip(3).take(3).copied().collect();
    assert_eq!(masses, vec![(3, expected.clone())]);

    for id in &expected {
        assert!(sim.village().get(*id).unwrap().is_rebellion_pending());
    }
    for id in ids.iter().skip(6) {
        let villager = sim.village().get(*id).unwrap();
        assert!(!villager.is_rebellion_pending());
        assert_eq!(villager.state(), VillagerState::Loyal);
    }

    run(&mut sim, 12);
    assert_eq!(sim.village().rebel_count(), 6);
    assert_eq!(sim.village().loyal_count(), 4);
}

#[test]
fn captain_rebellion_cascades_in_order() {
    let mut sim = simulation();
    let recorder = Recorder::default();
    sim.register_listener(Box::new(recorder.clone()));

    let captain = sim
        .recruit(Recruit::new("Cap", Role::Captain, spot(0)))
        .unwrap();
    let disgruntled = sim
        .recruit(Recruit::new("Grim", Role::Commoner, spot(1)).with_discontent(75.0))
        .unwrap();
    let calm = sim
        .recruit(Recruit::new("Calm", Role::Commoner, spot(2)).with_discontent(60.0))
        .unwrap();
    let farmer = sim
        .recruit(Recruit::new("Sow", Role::Farmer, spot(3)).with_discontent(90.0))
        .unwrap();

    sim.force_max_discontent(captain).unwrap();
    run(&mut sim, 12);

    let events = recorder.events();
    let rebelled = events.iter().position(|e| {
        matches!(e, SimEvent::VillagerRebelled { villager, .. } if *villager == captain)
    });
    let cascade = events.iter().position(|e| {
        matches!(e, SimEvent::CaptainCascade { captain: c, forced } if *c == captain && forced == &vec![disgruntled])
    });
    let forced_start = events.iter().position(|e| {
        matches!(e, SimEvent::RebellionStarted { villager } if *villager == disgruntled)
    });
    assert!(rebelled.is_some() && cascade.is_some() && forced_start.is_some());
    assert!(rebelled < cascade);
    assert!(cascade < forced_start);

    assert!(!sim.village().get(calm).unwrap().is_rebellion_pending());
    assert!(!sim.village().get(farmer).unwrap().is_rebellion_pending());
}

fn short_days() -> Simulation {
    let config = SimulationConfig {
        clock: ClockConfig {
            day_length_seconds: 10.0,
            night_fraction: 0.5,
        },
        ..SimulationConfig::default()
    };
    Simulation::new(config).unwrap()
}

#[test]
fn greed_sours_the_village_at_nightfall() {
    let mut modest = short_days();
    let calm = modest
        .recruit(Recruit::new("Dee", Role::Commoner, spot(0)))
        .unwrap();
    run(&mut modest, 50);

    let mut greedy = short_days();
    let soured = greedy
        .recruit(Recruit::new("Dee", Role::Commoner, spot(0)))
        .unwrap();
    greedy
        .apply_power_command(PowerCommand::TakeFromCommunal(10))
        .unwrap();
    run(&mut greedy, 50);

    assert!(modest.clock().is_night() && greedy.clock().is_night());
    let baseline = modest.village().get(calm).unwrap().discontent();
    let resentful = greedy.village().get(soured).unwrap().discontent();
    assert!(resentful > baseline + 1.0);
}
