/// Simulator configuration
use crate::error::{Result, SimulatorError};
use cadence_playback::PlayerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Directory holding one JSON file per stored playlist
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Wall-clock interval between `timeupdate`s
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Simulated seconds per wall-clock second
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Song ids with no playable resource
    #[serde(default)]
    pub broken: Vec<String>,

    /// Song ids whose resource faults mid-playback
    #[serde(default)]
    pub faulty: Vec<String>,

    /// Position at which faulty songs fault, in seconds
    #[serde(default = "default_fault_at")]
    pub fault_at: f64,

    /// Stop after this many wall-clock seconds; run until Ctrl-C if unset
    #[serde(default)]
    pub run_for_secs: Option<u64>,
}

impl SimulationSettings {
    /// Simulated seconds that pass per tick
    pub fn step(&self) -> f64 {
        self.speed * (self.tick_ms as f64 / 1000.0)
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            speed: default_speed(),
            broken: Vec::new(),
            faulty: Vec::new(),
            fault_at: default_fault_at(),
            run_for_secs: None,
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from file and environment
    ///
    /// `path` is optional; without it `cadence.toml` is read when present.
    /// Environment variables prefixed `CADENCE_` override the file, nested
    /// keys separated by `__` (`CADENCE_PLAYER__MODE=peak`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("cadence.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Self::build(settings)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(toml: &str) -> Result<Self> {
        Self::build(
            config::Config::builder()
                .add_source(config::File::from_str(toml, config::FileFormat::Toml)),
        )
    }

    fn build(settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config = settings
            .build()
            .map_err(|e| SimulatorError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| SimulatorError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.player.volume) {
            return Err(SimulatorError::Config(format!(
                "volume must be within 0..=1, got {}",
                self.player.volume
            )));
        }

        if self.simulation.tick_ms == 0 {
            return Err(SimulatorError::Config(
                "simulation.tick_ms must be positive".to_string(),
            ));
        }

        if !(self.simulation.speed.is_finite() && self.simulation.speed > 0.0) {
            return Err(SimulatorError::Config(format!(
                "simulation.speed must be positive, got {}",
                self.simulation.speed
            )));
        }

        if self.player.playlist_mode.is_empty() {
            return Err(SimulatorError::Config(
                "player.playlist_mode must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            storage: default_storage(),
            simulation: SimulationSettings::default(),
        }
    }
}

// Default values
fn default_storage() -> StorageSettings {
    StorageSettings {
        data_dir: default_data_dir(),
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_tick_ms() -> u64 {
    250
}

fn default_speed() -> f64 {
    10.0
}

fn default_fault_at() -> f64 {
    5.0
}
