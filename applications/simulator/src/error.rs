/// Simulator error types
use cadence_core::CadenceError;
use cadence_playback::PlaybackError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimulatorError>;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CadenceError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl From<cadence_storage::StorageError> for SimulatorError {
    fn from(e: cadence_storage::StorageError) -> Self {
        Self::Core(e.into())
    }
}
