//! Instrument playback targets
//!
//! This module provides the seam between the scheduler and whatever
//! actually makes sound:
//! - [`Instrument`] trait accepting play/stop commands at absolute clock times
//! - [`InstrumentLoader`] trait for acquiring an instrument by identifier
//! - [`InstrumentSlot`] holding the result of an asynchronous acquisition
//! - [`LogInstrument`] for dry runs
//! - [`mock`] implementations that record every dispatch, for testing
//!
mod log_instrument;
pub mod mock;
mod slot;

use crate::pitch::PitchError;
use thiserror::Error;

pub use log_instrument::{LogInstrument, LogLoader};
pub use slot::{resolve, InstrumentSlot, SlotState};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstrumentError {
    #[error("unknown instrument `{0}`")]
    UnknownInstrument(String),
    #[error("instrument connection error: {0}")]
    Connection(String),
    #[error(transparent)]
    Pitch(#[from] PitchError),
}

/// A playback target. Times are absolute clock-source seconds and may lie in
/// the future; implementations are responsible for sounding them on time.
pub trait Instrument: Send {
    fn play(&mut self, pitch: &str, at: f64);

    /// Releases what was started by the preceding `play` calls.
    fn stop(&mut self, at: f64);

    fn play_with_velocity(&mut self, pitch: &str, at: f64, _velocity: u8) {
        self.play(pitch, at);
    }
}

/// Acquires instruments by identifier. Called off the scheduling path.
pub trait InstrumentLoader: Send + Sync {
    fn load(&self, id: &str) -> Result<Box<dyn Instrument>, InstrumentError>;
}
