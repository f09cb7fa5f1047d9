use super::{Instrument, InstrumentError, InstrumentLoader};
use log::info;

/// Instrument that only logs what it is asked to play.
pub struct LogInstrument {
    name: String,
}

impl LogInstrument {
    pub fn new(name: impl Into<String>) -> Self {
        LogInstrument { name: name.into() }
    }
}

impl Instrument for LogInstrument {
    fn play(&mut self, pitch: &str, at: f64) {
        info!("[{}] play {} at {:.3}s", self.name, pitch, at);
    }

    fn stop(&mut self, at: f64) {
        info!("[{}] stop at {:.3}s", self.name, at);
    }

    fn play_with_velocity(&mut self, pitch: &str, at: f64, velocity: u8) {
        info!(
            "[{}] play {} (vel {}) at {:.3}s",
            self.name, pitch, velocity, at
        );
    }
}

pub struct LogLoader;

impl InstrumentLoader for LogLoader {
    fn load(&self, id: &str) -> Result<Box<dyn Instrument>, InstrumentError> {
        Ok(Box::new(LogInstrument::new(id)))
    }
}
