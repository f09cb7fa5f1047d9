//! Musical time: tempo, bar/beat positions and the scheduling cursor.
//!
//! Positions are expressed as decimals where one unit is one bar and
//! [`BEAT_FRACTION`] is one beat, so `bar + beat / BEATS_PER_BAR` is the
//! decimal of a position. Bars are phrase-relative and wrap every
//! [`BARS_PER_PHRASE`] bars.

use crate::config::{
    BARS_PER_PHRASE, BEATS_PER_BAR, BEAT_FRACTION, PHRASE_LENGTH, POSITION_TOLERANCE,
};
use log::trace;
use std::fmt;

/// Tempo in beats per minute. Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub fn new(bpm: f64) -> Option<Self> {
        (bpm.is_finite() && bpm > 0.0).then_some(Tempo { bpm })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_length(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one bar in seconds
    pub fn bar_length(&self) -> f64 {
        self.beat_length() * BEATS_PER_BAR as f64
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}

/// Bar and beat within the phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MusicalPosition {
    bar: u32,
    beat: u32,
}

impl MusicalPosition {
    /// Out-of-range components wrap into the phrase.
    pub fn new(bar: u32, beat: u32) -> Self {
        let bar = (bar + beat / BEATS_PER_BAR) % BARS_PER_PHRASE;
        MusicalPosition {
            bar,
            beat: beat % BEATS_PER_BAR,
        }
    }

    /// The position whose beat slice contains `decimal`, wrapped into the phrase.
    pub fn from_decimal(decimal: f64) -> Self {
        let wrapped = decimal.rem_euclid(PHRASE_LENGTH);
        let beats = (wrapped / BEAT_FRACTION + POSITION_TOLERANCE).floor() as u32;
        Self::new(0, beats)
    }

    pub fn bar(&self) -> u32 {
        self.bar
    }

    pub fn beat(&self) -> u32 {
        self.beat
    }

    pub fn decimal(&self) -> f64 {
        self.bar as f64 + self.beat as f64 * BEAT_FRACTION
    }

    fn step(&mut self) {
        self.beat += 1;
        if self.beat >= BEATS_PER_BAR {
            self.beat = 0;
            self.bar = (self.bar + 1) % BARS_PER_PHRASE;
        }
    }
}

impl fmt::Display for MusicalPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.bar, self.beat)
    }
}

/// The position currently being scheduled and the clock time it starts at.
///
/// Clock time is derived from the anchor and a step count rather than
/// accumulated, so it does not drift over long sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    position: MusicalPosition,
    anchor: f64,
    steps: u64,
    beat_length: f64,
}

impl Cursor {
    pub fn new(tempo: Tempo) -> Self {
        Cursor {
            position: MusicalPosition::default(),
            anchor: 0.0,
            steps: 0,
            beat_length: tempo.beat_length(),
        }
    }

    /// Returns to bar 0 beat 0, starting at `clock_time`.
    pub fn reset(&mut self, clock_time: f64) {
        self.position = MusicalPosition::default();
        self.anchor = clock_time;
        self.steps = 0;
    }

    pub fn position(&self) -> MusicalPosition {
        self.position
    }

    pub fn clock_time(&self) -> f64 {
        self.anchor + self.steps as f64 * self.beat_length
    }

    pub fn beat_length(&self) -> f64 {
        self.beat_length
    }

    /// Moves forward one beat, wrapping the bar at the end of the phrase.
    pub fn advance(&mut self) {
        self.position.step();
        self.steps += 1;
        trace!(
            "Cursor advanced to {} at {:.6}s",
            self.position,
            self.clock_time()
        );
    }

    /// Absolute clock time of a decimal position, measured from this cursor.
    pub fn to_clock_time(&self, decimal: f64) -> f64 {
        self.clock_time()
            + (decimal - self.position.decimal()) * self.beat_length * BEATS_PER_BAR as f64
    }

    /// Whether `decimal` falls in the beat slice the cursor is on.
    pub fn contains(&self, decimal: f64) -> bool {
        let start = self.position.decimal();
        decimal >= start - POSITION_TOLERANCE
            && decimal < start + BEAT_FRACTION - POSITION_TOLERANCE
    }
}
