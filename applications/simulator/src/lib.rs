//! Cadence Simulator
//!
//! Runs the playback engine against a simulated media host so the retry,
//! preview and persistence behaviour can be watched in the logs.

pub mod config;
pub mod demo;
pub mod error;
pub mod host;

pub use config::{SimulationSettings, SimulatorConfig, StorageSettings};
pub use error::{Result, SimulatorError};
pub use host::{Deck, SimBackend};
