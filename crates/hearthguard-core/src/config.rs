//! Configuration loading and typed config structures for the Hearthguard
//! simulation.
//!
//! The canonical configuration lives in `hearthguard-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure and a loader that reads and validates the file. Every
//! section and field has a default, so an empty file is a valid config.
//!
//! The villager sections (`discontent`, `efficiency`, `combat`,
//! `mage_buff`, `influence`, `health`) reuse the types from
//! `hearthguard-villagers`, and `power` reuses the economy's
//! [`PowerConfig`].

use std::path::Path;

pub use hearthguard_power::PowerConfig;
use hearthguard_villagers::{
    CombatConfig, DiscontentConfig, EfficiencyConfig, HealthConfig, InfluenceConfig,
    MageBuffConfig, VillagerConfig, VillagerError,
};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A simulation-level value is out of range.
    #[error("invalid config `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A villager section is out of range.
    #[error("invalid villager config: {source}")]
    Villager {
        /// The underlying villager config error.
        #[from]
        source: VillagerError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `hearthguard-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, frame timing).
    #[serde(default)]
    pub world: WorldConfig,

    /// Day/night cycle.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Discontent accrual and rebellion timing.
    #[serde(default)]
    pub discontent: DiscontentConfig,

    /// Combat efficiency curve.
    #[serde(default)]
    pub efficiency: EfficiencyConfig,

    /// Per-role combat numbers.
    #[serde(default)]
    pub combat: CombatConfig,

    /// Mage support.
    #[serde(default)]
    pub mage_buff: MageBuffConfig,

    /// Captain influence.
    #[serde(default)]
    pub influence: InfluenceConfig,

    /// Villager hit points.
    #[serde(default)]
    pub health: HealthConfig,

    /// Cascade rebellion thresholds.
    #[serde(default)]
    pub cascade: CascadeConfig,

    /// Farmer production and nightly distribution.
    #[serde(default)]
    pub food: FoodConfig,

    /// Power economy.
    #[serde(default)]
    pub power: PowerConfig,

    /// The player.
    #[serde(default)]
    pub player: PlayerConfig,

    /// Raiders.
    #[serde(default)]
    pub raiders: RaiderConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or a
    /// validation error if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or a
    /// validation error if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml rejects an empty document, which should mean "all defaults".
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Bundle the villager sections for the villager crate.
    pub fn villager_config(&self) -> VillagerConfig {
        VillagerConfig {
            discontent: self.discontent.clone(),
            efficiency: self.efficiency.clone(),
            combat: self.combat.clone(),
            mage_buff: self.mage_buff.clone(),
            influence: self.influence.clone(),
            health: self.health.clone(),
        }
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.villager_config().validate()?;

        positive(self.world.frame_seconds, "world.frame_seconds")?;
        positive(self.world.building_max_health, "world.building_max_health")?;
        if self.clock.day_length_seconds.is_nan() || self.clock.day_length_seconds <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "clock.day_length_seconds",
                reason: "must be greater than zero",
            });
        }
        if !(0.0..1.0).contains(&self.clock.night_fraction) {
            return Err(ConfigError::Invalid {
                field: "clock.night_fraction",
                reason: "must be within [0, 1)",
            });
        }

        let c = &self.cascade;
        percent(c.captain_cascade_threshold, "cascade.captain_cascade_threshold")?;
        percent(c.mass_threshold, "cascade.mass_threshold")?;
        if !(c.mass_min_fraction > 0.0 && c.mass_min_fraction <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "cascade.mass_min_fraction",
                reason: "must be within (0, 1]",
            });
        }
        if c.mass_min_rebels == 0 {
            return Err(ConfigError::Invalid {
                field: "cascade.mass_min_rebels",
                reason: "must be at least one",
            });
        }

        non_negative(self.food.production_per_farmer, "food.production_per_farmer")?;
        non_negative(self.food.production_bonus_per_tier, "food.production_bonus_per_tier")?;

        if !(0.0..1.0).contains(&self.power.greed_threshold) {
            return Err(ConfigError::Invalid {
                field: "power.greed_threshold",
                reason: "must be within [0, 1)",
            });
        }
        positive(self.power.drop_lifetime_seconds, "power.drop_lifetime_seconds")?;
        if self.power.player_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "power.player_capacity",
                reason: "must be at least one",
            });
        }

        let p = &self.player;
        positive(p.max_health, "player.max_health")?;
        non_negative(p.damage, "player.damage")?;
        positive(p.attack_cooldown_seconds, "player.attack_cooldown_seconds")?;
        non_negative(p.attack_range, "player.attack_range")?;
        non_negative(p.pickup_radius, "player.pickup_radius")?;

        let r = &self.raiders;
        positive(r.max_health, "raiders.max_health")?;
        non_negative(r.damage, "raiders.damage")?;
        positive(r.attack_cooldown_seconds, "raiders.attack_cooldown_seconds")?;
        non_negative(r.attack_range, "raiders.attack_range")?;
        non_negative(r.move_speed, "raiders.move_speed")?;
        non_negative(r.wave_interval_seconds, "raiders.wave_interval_seconds")?;
        Ok(())
    }
}

const fn positive(value: f32, field: &'static str) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero",
        })
    }
}

const fn non_negative(value: f32, field: &'static str) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must not be negative",
        })
    }
}

fn percent(value: f32, field: &'static str) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be within [0, 100]",
        })
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable village name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for the village layout and raid waves.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Simulated seconds per frame.
    #[serde(default = "default_frame_seconds")]
    pub frame_seconds: f32,

    /// Real-time milliseconds between frames (0 = run flat out).
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Hit points of a building.
    #[serde(default = "default_building_max_health")]
    pub building_max_health: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            frame_seconds: default_frame_seconds(),
            frame_interval_ms: default_frame_interval_ms(),
            building_max_health: default_building_max_health(),
        }
    }
}

/// Day/night cycle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClockConfig {
    /// Length of a full day (day plus night) in simulated seconds.
    #[serde(default = "default_day_length_seconds")]
    pub day_length_seconds: f64,

    /// Fraction of the day that is night. Night comes at the end of the day.
    #[serde(default = "default_night_fraction")]
    pub night_fraction: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            day_length_seconds: default_day_length_seconds(),
            night_fraction: default_night_fraction(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Frames between status reports (0 = never).
    #[serde(default = "default_status_interval_frames")]
    pub status_interval_frames: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            status_interval_frames: default_status_interval_frames(),
        }
    }
}

/// Cascade rebellion thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CascadeConfig {
    /// Discontent at which a commoner follows a rebelling captain.
    #[serde(default = "default_captain_cascade_threshold")]
    pub captain_cascade_threshold: f32,

    /// Rebel count that triggers a mass rebellion.
    #[serde(default = "default_mass_min_rebels")]
    pub mass_min_rebels: u32,

    /// Rebel fraction of the roster that triggers a mass rebellion.
    #[serde(default = "default_mass_min_fraction")]
    pub mass_min_fraction: f32,

    /// Discontent at which a loyal villager joins a mass rebellion.
    #[serde(default = "default_mass_threshold")]
    pub mass_threshold: f32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            captain_cascade_threshold: default_captain_cascade_threshold(),
            mass_min_rebels: default_mass_min_rebels(),
            mass_min_fraction: default_mass_min_fraction(),
            mass_threshold: default_mass_threshold(),
        }
    }
}

/// Farmer production.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FoodConfig {
    /// Food produced per farmer per night at tier 0.
    #[serde(default = "default_production_per_farmer")]
    pub production_per_farmer: f32,

    /// Fractional production bonus per farmer tier.
    #[serde(default = "default_production_bonus_per_tier")]
    pub production_bonus_per_tier: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            production_per_farmer: default_production_per_farmer(),
            production_bonus_per_tier: default_production_bonus_per_tier(),
        }
    }
}

/// The player.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerConfig {
    /// Display name, also used for the player's power holder.
    #[serde(default = "default_player_name")]
    pub name: String,

    /// Hit points.
    #[serde(default = "default_player_max_health")]
    pub max_health: f32,

    /// Damage per strike.
    #[serde(default = "default_player_damage")]
    pub damage: f32,

    /// Seconds between strikes.
    #[serde(default = "default_player_attack_cooldown")]
    pub attack_cooldown_seconds: f32,

    /// Reach of a strike.
    #[serde(default = "default_player_attack_range")]
    pub attack_range: f32,

    /// Radius within which power drops are collected.
    #[serde(default = "default_pickup_radius")]
    pub pickup_radius: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: default_player_name(),
            max_health: default_player_max_health(),
            damage: default_player_damage(),
            attack_cooldown_seconds: default_player_attack_cooldown(),
            attack_range: default_player_attack_range(),
            pickup_radius: default_pickup_radius(),
        }
    }
}

/// Raiders and raid waves.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RaiderConfig {
    /// Hit points.
    #[serde(default = "default_raider_max_health")]
    pub max_health: f32,

    /// Damage per strike.
    #[serde(default = "default_raider_damage")]
    pub damage: f32,

    /// Seconds between strikes.
    #[serde(default = "default_raider_attack_cooldown")]
    pub attack_cooldown_seconds: f32,

    /// Reach of a strike.
    #[serde(default = "default_raider_attack_range")]
    pub attack_range: f32,

    /// Walking speed in units per second.
    #[serde(default = "default_raider_move_speed")]
    pub move_speed: f32,

    /// Simulated seconds between raid waves (0 = no waves).
    #[serde(default = "default_wave_interval_seconds")]
    pub wave_interval_seconds: f32,

    /// Raiders in the first wave.
    #[serde(default = "default_wave_size")]
    pub wave_size: u32,

    /// Raiders added to each later wave.
    #[serde(default = "default_wave_growth")]
    pub wave_growth: u32,

    /// Distance from the village center at which raiders appear.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f32,
}

impl Default for RaiderConfig {
    fn default() -> Self {
        Self {
            max_health: default_raider_max_health(),
            damage: default_raider_damage(),
            attack_cooldown_seconds: default_raider_attack_cooldown(),
            attack_range: default_raider_attack_range(),
            move_speed: default_raider_move_speed(),
            wave_interval_seconds: default_wave_interval_seconds(),
            wave_size: default_wave_size(),
            wave_growth: default_wave_growth(),
            spawn_radius: default_spawn_radius(),
        }
    }
}

/// Simulation boundary parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum frames to run (0 = unlimited).
    #[serde(default = "default_max_frames")]
    pub max_frames: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,

    /// Stop once no loyal villager is left.
    #[serde(default = "default_true")]
    pub stop_on_collapse: bool,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_frames: default_max_frames(),
            max_real_time_seconds: 0,
            stop_on_collapse: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Hearthguard".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_frame_seconds() -> f32 {
    1.0 / 60.0
}

const fn default_frame_interval_ms() -> u64 {
    0
}

const fn default_building_max_health() -> f32 {
    300.0
}

const fn default_day_length_seconds() -> f64 {
    120.0
}

const fn default_night_fraction() -> f64 {
    0.35
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_status_interval_frames() -> u64 {
    600
}

const fn default_captain_cascade_threshold() -> f32 {
    70.0
}

const fn default_mass_min_rebels() -> u32 {
    3
}

const fn default_mass_min_fraction() -> f32 {
    0.4
}

const fn default_mass_threshold() -> f32 {
    40.0
}

const fn default_production_per_farmer() -> f32 {
    2.0
}

const fn default_production_bonus_per_tier() -> f32 {
    0.5
}

fn default_player_name() -> String {
    "Warden".to_owned()
}

const fn default_player_max_health() -> f32 {
    200.0
}

const fn default_player_damage() -> f32 {
    20.0
}

const fn default_player_attack_cooldown() -> f32 {
    0.8
}

const fn default_player_attack_range() -> f32 {
    2.0
}

const fn default_pickup_radius() -> f32 {
    1.5
}

const fn default_raider_max_health() -> f32 {
    60.0
}

const fn default_raider_damage() -> f32 {
    8.0
}

const fn default_raider_attack_cooldown() -> f32 {
    1.5
}

const fn default_raider_attack_range() -> f32 {
    1.2
}

const fn default_raider_move_speed() -> f32 {
    2.0
}

const fn default_wave_interval_seconds() -> f32 {
    90.0
}

const fn default_wave_size() -> u32 {
    4
}

const fn default_wave_growth() -> u32 {
    1
}

const fn default_spawn_radius() -> f32 {
    25.0
}

const fn default_max_frames() -> u64 {
    36_000
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.cascade.mass_min_rebels, 3);
        assert_eq!(config.power.communal_start, 10);
        assert_eq!(config.combat.retarget_frames, 30);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  name: "Test Village"
  seed: 123
  frame_seconds: 0.05
  frame_interval_ms: 16

clock:
  day_length_seconds: 60
  night_fraction: 0.5

logging:
  level: "debug"
  json: true
  status_interval_frames: 100

discontent:
  base_discontent_rate: 2.0
  telegraph_seconds: 0.5

combat:
  retarget_frames: 10
  commoner:
    damage: { base: 12, per_tier: 4 }
    base_cooldown: 1.0
    cooldown_reduction_per_tier: 0.1
    range: { base: 1.5, per_tier: 0.25 }
    detection_radius: 9

influence:
  base_followers: 1
  followers_per_tier: 2

cascade:
  captain_cascade_threshold: 60
  mass_min_rebels: 5
  mass_min_fraction: 0.3
  mass_threshold: 35

food:
  production_per_farmer: 3.0

power:
  communal_start: 20
  greed_threshold: 0.6

raiders:
  wave_size: 6

simulation:
  max_frames: 500
  stop_on_collapse: false
"#;

        let config = SimulationConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.world.name, "Test Village");
        assert_eq!(config.world.seed, 123);
        assert!(config.logging.json);
        assert!((config.discontent.base_discontent_rate - 2.0).abs() < f32::EPSILON);
        assert!((config.discontent.angry_threshold - 50.0).abs() < f32::EPSILON);
        assert_eq!(config.combat.retarget_frames, 10);
        assert!((config.combat.commoner.detection_radius - 9.0).abs() < f32::EPSILON);
        assert_eq!(config.influence.followers_per_tier, 2);
        assert_eq!(config.cascade.mass_min_rebels, 5);
        assert_eq!(config.power.communal_start, 20);
        assert_eq!(config.power.player_capacity, 50);
        assert_eq!(config.raiders.wave_size, 6);
        assert_eq!(config.simulation.max_frames, 500);
        assert!(!config.simulation.stop_on_collapse);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimulationConfig::parse("world:\n  seed: 7\n");
        let config = config.ok().unwrap_or_default();
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.world.name, "Hearthguard");
        assert!((config.cascade.mass_threshold - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(SimulationConfig::parse("").is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let bad_night = SimulationConfig::parse("clock:\n  night_fraction: 1.5\n");
        assert!(matches!(
            bad_night,
            Err(ConfigError::Invalid {
                field: "clock.night_fraction",
                ..
            })
        ));

        let bad_thresholds =
            SimulationConfig::parse("discontent:\n  angry_threshold: 100\n  rebel_threshold: 90\n");
        assert!(matches!(bad_thresholds, Err(ConfigError::Villager { .. })));

        let bad_yaml = SimulationConfig::parse("world: [unclosed");
        assert!(matches!(bad_yaml, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn villager_sections_are_bundled() {
        let config = SimulationConfig::parse("mage_buff:\n  factor: 1.5\n")
            .ok()
            .unwrap_or_default();
        let villager = config.villager_config();
        assert!((villager.mage_buff.factor - 1.5).abs() < f32::EPSILON);
        assert_eq!(villager.combat, config.combat);
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("hearthguard-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
