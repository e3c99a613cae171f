//! Frame callback that steers the headless run.
//!
//! The director stands in for a level script and a steward: it sends raid
//! waves on a fixed simulated-time schedule, spreads the communal pool at
//! dawn, and writes a status line every few hundred frames.

use std::f32::consts::TAU;

use glam::Vec2;
use hearthguard_core::{FrameSummary, PowerCommand, Simulation, TickCallback};
use hearthguard_types::SimEvent;
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::spawner::VillageLayout;

/// Callback that sends raids, distributes power and reports status.
pub struct Director {
    rng: StdRng,
    wave_interval_seconds: f64,
    wave_size: u32,
    wave_growth: u32,
    spawn_radius: f32,
    status_interval_frames: u64,
    auto_distribute: bool,
    next_wave_at: f64,
    waves_sent: u32,
}

impl Director {
    /// Create a director for `simulation`, seeded with `rng`.
    pub fn new(simulation: &Simulation, layout: &VillageLayout, rng: StdRng) -> Self {
        let config = simulation.config();
        let wave_interval_seconds = f64::from(config.raiders.wave_interval_seconds);
        Self {
            rng,
            wave_interval_seconds,
            wave_size: config.raiders.wave_size,
            wave_growth: config.raiders.wave_growth,
            spawn_radius: config.raiders.spawn_radius,
            status_interval_frames: config.logging.status_interval_frames,
            auto_distribute: layout.auto_distribute_at_dawn,
            next_wave_at: simulation.clock().elapsed_seconds() + wave_interval_seconds,
            waves_sent: 0,
        }
    }

    /// Raid waves sent so far.
    pub const fn waves_sent(&self) -> u32 {
        self.waves_sent
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::arithmetic_side_effects,
        reason = "wave sizes stay far below 2^24; glam math is f32"
    )]
    fn send_wave(&mut self, simulation: &mut Simulation) {
        let size = self
            .wave_size
            .saturating_add(self.wave_growth.saturating_mul(self.waves_sent));
        let heading = self.rng.random_range(0.0..TAU);
        for index in 0..size {
            // Spread the wave over a quarter circle around its heading.
            let offset = (index as f32 / size.max(1) as f32 - 0.5) * (TAU / 4.0);
            let position = Vec2::from_angle(heading + offset) * self.spawn_radius;
            simulation.spawn_raider(position);
        }
        self.waves_sent = self.waves_sent.saturating_add(1);
        info!(
            wave = self.waves_sent,
            raiders = size,
            frame = simulation.clock().frame(),
            "Raid wave arrived"
        );
    }

    fn distribute(simulation: &mut Simulation) {
        match simulation.apply_power_command(PowerCommand::AutoDistribute) {
            Ok(moved) => debug!(moved, "Communal power distributed at dawn"),
            Err(e) => warn!(error = %e, "Dawn distribution failed"),
        }
    }
}

impl TickCallback for Director {
    fn on_frame(&mut self, summary: &FrameSummary, simulation: &mut Simulation) {
        if self.wave_interval_seconds > 0.0 && summary.elapsed_seconds >= self.next_wave_at {
            self.send_wave(simulation);
            self.next_wave_at += self.wave_interval_seconds;
        }

        let dawn = simulation
            .events()
            .iter()
            .any(|event| matches!(event, SimEvent::DayBegan { .. }));
        if dawn && self.auto_distribute {
            Self::distribute(simulation);
        }

        if summary.frame.checked_rem(self.status_interval_frames) == Some(0) {
            info!(
                frame = summary.frame,
                day = summary.day,
                night = summary.is_night,
                villagers = summary.villagers,
                loyal = summary.loyal,
                rebels = summary.rebels,
                raiders = summary.raiders,
                communal_power = summary.communal_power,
                "Village status"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearthguard_core::SimulationConfig;
    use hearthguard_core::config::{ClockConfig, RaiderConfig};
    use rand::SeedableRng;

    use super::*;

    fn tick(sim: &mut Simulation, director: &mut Director, frames: u32) {
        for _ in 0..frames {
            let summary = sim.tick(0.5).unwrap();
            director.on_frame(&summary, sim);
        }
    }

    fn raid_config() -> SimulationConfig {
        SimulationConfig {
            raiders: RaiderConfig {
                wave_interval_seconds: 2.0,
                wave_size: 2,
                wave_growth: 1,
                spawn_radius: 200.0,
                ..RaiderConfig::default()
            },
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn waves_grow_on_schedule() {
        let mut sim = Simulation::new(raid_config()).unwrap();
        let mut director = Director::new(&sim, &VillageLayout::default(), StdRng::seed_from_u64(9));

        tick(&mut sim, &mut director, 3);
        assert_eq!(director.waves_sent(), 0);
        assert_eq!(sim.world().raiders_alive(), 0);

        tick(&mut sim, &mut director, 1);
        assert_eq!(director.waves_sent(), 1);
        assert_eq!(sim.world().raiders_alive(), 2);

        tick(&mut sim, &mut director, 4);
        assert_eq!(director.waves_sent(), 2);
        assert_eq!(sim.world().raiders_alive(), 5);
    }

    #[test]
    fn raiders_arrive_on_the_spawn_ring() {
        let mut sim = Simulation::new(raid_config()).unwrap();
        let mut director = Director::new(&sim, &VillageLayout::default(), StdRng::seed_from_u64(2));
        tick(&mut sim, &mut director, 4);

        for raider in sim.world().raiders() {
            let distance = raider.position().length();
            assert!(distance > 190.0 && distance < 201.0);
        }
    }

    #[test]
    fn zero_interval_sends_no_waves() {
        let config = SimulationConfig {
            raiders: RaiderConfig {
                wave_interval_seconds: 0.0,
                ..RaiderConfig::default()
            },
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(config).unwrap();
        let mut director = Director::new(&sim, &VillageLayout::default(), StdRng::seed_from_u64(1));
        tick(&mut sim, &mut director, 20);
        assert_eq!(director.waves_sent(), 0);
    }

    #[test]
    fn dawn_spreads_the_communal_pool() {
        let config = SimulationConfig {
            clock: ClockConfig {
                day_length_seconds: 4.0,
                night_fraction: 0.5,
            },
            raiders: RaiderConfig {
                wave_interval_seconds: 0.0,
                ..RaiderConfig::default()
            },
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(config).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let layout = VillageLayout {
            buildings: 0,
            captains: 0,
            farmers: 0,
            mages: 0,
            builders: 0,
            commoners: 2,
            ..VillageLayout::default()
        };
        crate::spawner::spawn_village(&layout, &mut sim, &mut rng).unwrap();
        let mut director = Director::new(&sim, &layout, rng);

        tick(&mut sim, &mut director, 9);
        assert_eq!(sim.clock().day(), 2);
        assert!(sim.economy().communal_power() < 10);
        assert!(sim.economy().verify_conservation().is_balanced());
    }
}
