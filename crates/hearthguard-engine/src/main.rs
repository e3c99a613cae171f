//! Headless engine binary for the Hearthguard simulation.
//!
//! Wires the configuration, the village spawner and the raid director
//! into the frame loop, then runs until a termination condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `hearthguard-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the simulation and attach the tracing listener
//! 4. Spawn the village from the `village` section
//! 5. Create run control from the simulation bounds
//! 6. Install the Ctrl-C handler
//! 7. Run the frame loop with the director
//! 8. Log the result and the final snapshot

mod director;
mod error;
mod spawner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hearthguard_core::{
    RunControl, Simulation, SimulationConfig, TracingListener, log_simulation_end, run_simulation,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::director::Director;
use crate::error::EngineError;
use crate::spawner::VillageLayout;

/// Environment variable naming an alternative config file.
const CONFIG_ENV: &str = "HEARTHGUARD_CONFIG";

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG: &str = "hearthguard-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the run itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let path = config_path();
    let config = load_config(&path)?;

    // 2. Initialize structured logging.
    init_tracing(&config);
    info!(
        config = %path.display(),
        world_name = config.world.name,
        seed = config.world.seed,
        frame_seconds = config.world.frame_seconds,
        "hearthguard-engine starting"
    );

    // 3. Build the simulation.
    let seed = config.world.seed;
    let frame_interval_ms = config.world.frame_interval_ms;
    let bounds = config.simulation.clone();
    let mut simulation = Simulation::new(config).map_err(EngineError::from)?;
    simulation.register_listener(Box::new(TracingListener));

    // 4. Spawn the village.
    let layout = load_village_layout(&path)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let spawned = spawner::spawn_village(&layout, &mut simulation, &mut rng)?;
    info!(
        buildings = spawned.buildings.len(),
        villagers = spawned.villagers.len(),
        auto_distribute = layout.auto_distribute_at_dawn,
        "Village ready"
    );

    // 5. Create run control.
    let control = Arc::new(RunControl::new(frame_interval_ms, &bounds));
    info!(
        max_frames = control.max_frames(),
        max_real_time_seconds = control.max_real_time_seconds(),
        stop_on_collapse = control.stop_on_collapse(),
        "Run control initialized"
    );

    // 6. Stop cleanly on Ctrl-C.
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }

    // 7. Run the simulation.
    let mut director = Director::new(&simulation, &layout, rng);
    let result = run_simulation(&mut simulation, &control, &mut director)
        .await
        .map_err(EngineError::from)?;

    // 8. Log results.
    log_simulation_end(&result);
    match serde_json::to_string(&simulation.snapshot()) {
        Ok(json) => debug!(snapshot = json, "Final village snapshot"),
        Err(e) => warn!(error = %e, "failed to serialize final snapshot"),
    }

    info!(
        end_reason = ?result.end_reason,
        total_frames = result.total_frames,
        waves = director.waves_sent(),
        "hearthguard-engine shutdown complete"
    );

    Ok(())
}

/// Config file path from `HEARTHGUARD_CONFIG`, or the default.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from)
}

/// Load the simulation configuration, falling back to defaults when the
/// file does not exist.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        Ok(SimulationConfig::default())
    }
}

/// Set up the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &SimulationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the village layout from the `village` section of the config
/// file. A missing file or section means defaults.
fn load_village_layout(path: &Path) -> Result<VillageLayout, EngineError> {
    if !path.exists() {
        return Ok(VillageLayout::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Spawner {
        message: format!("failed to read config file: {e}"),
    })?;
    if contents.trim().is_empty() {
        return Ok(VillageLayout::default());
    }

    // Parse the full YAML and extract just the "village" section.
    let raw: serde_yml::Value = serde_yml::from_str(&contents).map_err(|e| EngineError::Spawner {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    raw.get("village").map_or_else(
        || Ok(VillageLayout::default()),
        |section| {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Spawner {
                message: format!("failed to parse village config: {e}"),
            })
        },
    )
}
