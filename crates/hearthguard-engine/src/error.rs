//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup and the run so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hearthguard_core::ConfigError,
    },

    /// Building the simulation or applying a setup step failed.
    #[error("simulation error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: hearthguard_core::TickError,
    },

    /// The frame loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: hearthguard_core::RunnerError,
    },

    /// The village layout could not be read.
    #[error("spawner error: {message}")]
    Spawner {
        /// Description of the spawner failure.
        message: String,
    },
}
