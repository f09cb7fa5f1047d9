use super::{Instrument, InstrumentError, InstrumentLoader};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// One command received by a recording instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Play { pitch: String, at: f64, velocity: u8 },
    Stop { at: f64 },
}

impl Dispatch {
    pub fn at(&self) -> f64 {
        match self {
            Dispatch::Play { at, .. } | Dispatch::Stop { at } => *at,
        }
    }
}

/// Dispatches received by every instrument sharing this log, tagged with the
/// instrument identifier.
#[derive(Debug, Clone, Default)]
pub struct DispatchLog {
    entries: Arc<Mutex<Vec<(String, Dispatch)>>>,
}

impl DispatchLog {
    fn push(&self, id: &str, dispatch: Dispatch) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id.to_string(), dispatch));
    }

    pub fn entries(&self) -> Vec<(String, Dispatch)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn for_instrument(&self, id: &str) -> Vec<Dispatch> {
        self.entries()
            .into_iter()
            .filter(|(owner, _)| owner == id)
            .map(|(_, dispatch)| dispatch)
            .collect()
    }

    pub fn plays(&self) -> Vec<(String, String, f64)> {
        self.entries()
            .into_iter()
            .filter_map(|(owner, dispatch)| match dispatch {
                Dispatch::Play { pitch, at, .. } => Some((owner, pitch, at)),
                Dispatch::Stop { .. } => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

pub struct RecordingInstrument {
    id: String,
    log: DispatchLog,
}

impl RecordingInstrument {
    pub fn new(id: impl Into<String>, log: DispatchLog) -> Self {
        RecordingInstrument { id: id.into(), log }
    }
}

impl Instrument for RecordingInstrument {
    fn play(&mut self, pitch: &str, at: f64) {
        self.play_with_velocity(pitch, at, crate::config::DEFAULT_VELOCITY);
    }

    fn stop(&mut self, at: f64) {
        self.log.push(&self.id, Dispatch::Stop { at });
    }

    fn play_with_velocity(&mut self, pitch: &str, at: f64, velocity: u8) {
        self.log.push(
            &self.id,
            Dispatch::Play {
                pitch: pitch.to_string(),
                at,
                velocity,
            },
        );
    }
}

/// Loads a [`RecordingInstrument`] for any identifier not marked as failing.
pub struct MockLoader {
    log: DispatchLog,
    failing: HashSet<String>,
}

impl MockLoader {
    pub fn new(log: DispatchLog) -> Self {
        MockLoader {
            log,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }
}

impl InstrumentLoader for MockLoader {
    fn load(&self, id: &str) -> Result<Box<dyn Instrument>, InstrumentError> {
        if self.failing.contains(id) {
            return Err(InstrumentError::UnknownInstrument(id.to_string()));
        }
        Ok(Box::new(RecordingInstrument::new(id, self.log.clone())))
    }
}
