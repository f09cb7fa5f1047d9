use crate::config::{DEFAULT_NOTE_LENGTH, DEFAULT_VELOCITY, PHRASE_LENGTH, POSITION_TOLERANCE};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoteError {
    #[error("note position {0} must lie in [0, {len})", len = PHRASE_LENGTH)]
    InvalidPosition(f64),
    #[error("note duration {0} must be positive")]
    InvalidDuration(f64),
    #[error("note velocity {0} exceeds 127")]
    InvalidVelocity(u8),
    #[error("note pitch must not be empty")]
    EmptyPitch,
}

/// A musical event. Position and duration are decimals (one unit per bar).
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pitch: String,
    position: f64,
    duration: f64,
    velocity: u8,
}

impl Note {
    /// A note with the default length and velocity.
    ///
    /// A position within tolerance of the phrase end is the start of the
    /// next phrase and is stored as 0.0.
    pub fn new(pitch: impl Into<String>, position: f64) -> Result<Self, NoteError> {
        let pitch = pitch.into();
        if pitch.trim().is_empty() {
            return Err(NoteError::EmptyPitch);
        }
        if !(position.is_finite() && (0.0..PHRASE_LENGTH).contains(&position)) {
            return Err(NoteError::InvalidPosition(position));
        }
        let position = if PHRASE_LENGTH - position < POSITION_TOLERANCE {
            0.0
        } else {
            position
        };
        Ok(Note {
            pitch,
            position,
            duration: DEFAULT_NOTE_LENGTH,
            velocity: DEFAULT_VELOCITY,
        })
    }

    pub fn with_duration(mut self, duration: f64) -> Result<Self, NoteError> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(NoteError::InvalidDuration(duration));
        }
        self.duration = duration;
        Ok(self)
    }

    pub fn with_velocity(mut self, velocity: u8) -> Result<Self, NoteError> {
        if velocity > 127 {
            return Err(NoteError::InvalidVelocity(velocity));
        }
        self.velocity = velocity;
        Ok(self)
    }

    pub fn pitch(&self) -> &str {
        &self.pitch
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn end(&self) -> f64 {
        self.position + self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let note = Note::new("C4", 1.5).unwrap();
        assert_eq!(note.pitch(), "C4");
        assert_eq!(note.position(), 1.5);
        assert_eq!(note.duration(), 0.25);
        assert_eq!(note.velocity(), 100);
        assert_eq!(note.end(), 1.75);
    }

    #[test]
    fn test_builder_overrides() {
        let note = Note::new("E4", 0.0)
            .and_then(|n| n.with_duration(1.0))
            .and_then(|n| n.with_velocity(64))
            .unwrap();
        assert_eq!(note.duration(), 1.0);
        assert_eq!(note.velocity(), 64);
    }

    #[test]
    fn test_rejects_invalid_fields() {
        assert_eq!(Note::new("", 0.0), Err(NoteError::EmptyPitch));
        assert_eq!(Note::new("C4", -0.25), Err(NoteError::InvalidPosition(-0.25)));
        assert_eq!(Note::new("C4", 4.0), Err(NoteError::InvalidPosition(4.0)));

        let note = Note::new("C4", 0.0).unwrap();
        assert_eq!(
            note.clone().with_duration(0.0),
            Err(NoteError::InvalidDuration(0.0))
        );
        assert_eq!(note.with_velocity(128), Err(NoteError::InvalidVelocity(128)));
    }

    #[test]
    fn test_position_at_phrase_end_wraps_to_start() {
        assert_eq!(Note::new("C4", 4.0 - 5e-10).unwrap().position(), 0.0);
        assert_eq!(Note::new("C4", 3.75 + 0.25 - 1e-12).unwrap().position(), 0.0);
        assert_eq!(Note::new("C4", 3.9999).unwrap().position(), 3.9999);
    }
}
