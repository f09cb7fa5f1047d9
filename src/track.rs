//! Tracks: notes bound to one instrument.

use crate::automation::AutomationLane;
use crate::instrument::{resolve, InstrumentLoader, InstrumentSlot, SlotState};
use crate::note::Note;
use crate::position::Cursor;
use crate::scheduler::Scheduler;
use log::{debug, trace};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixSettings {
    pub volume: f64,
    pub muted: bool,
    pub pan: f64,
}

impl Default for MixSettings {
    fn default() -> Self {
        MixSettings {
            volume: 0.0,
            muted: false,
            pan: 0.0,
        }
    }
}

pub struct Track {
    name: String,
    instrument: InstrumentSlot,
    notes: Vec<Note>,
    pub automation: Vec<AutomationLane>,
    pub settings: MixSettings,
}

impl Track {
    /// Creates a track named after `instrument_id` and starts acquiring the
    /// instrument on `scheduler`.
    pub fn new<S: Scheduler>(
        instrument_id: &str,
        loader: Arc<dyn InstrumentLoader>,
        scheduler: &S,
    ) -> Self {
        Self::with_slot(instrument_id, resolve(instrument_id, loader, scheduler))
    }

    pub fn with_slot(name: impl Into<String>, instrument: InstrumentSlot) -> Self {
        Track {
            name: name.into(),
            instrument,
            notes: Vec::new(),
            automation: Vec::new(),
            settings: MixSettings::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn instrument_state(&self) -> SlotState {
        self.instrument.state()
    }

    /// Inserts a note, keeping notes ordered by position.
    pub fn add_note(&mut self, note: Note) {
        let index = self
            .notes
            .partition_point(|n| n.position() <= note.position());
        self.notes.insert(index, note);
    }

    /// Dispatches the notes in the cursor's beat slice. Returns how many were
    /// dispatched; an unplayable or muted track dispatches nothing.
    pub fn schedule_slice(&self, cursor: &Cursor) -> usize {
        if self.settings.muted {
            trace!("Track '{}' muted, skipping", self.name);
            return 0;
        }

        let selected: Vec<&Note> = self
            .notes
            .iter()
            .filter(|note| cursor.contains(note.position()))
            .collect();
        if selected.is_empty() {
            return 0;
        }

        let dispatched = self.instrument.with_ready(|instrument| {
            for note in &selected {
                let start_time = cursor.to_clock_time(note.position());
                let stop_time = cursor.to_clock_time(note.end());
                trace!(
                    "Track '{}': {} at {:.6}s until {:.6}s",
                    self.name,
                    note.pitch(),
                    start_time,
                    stop_time
                );
                instrument.play_with_velocity(note.pitch(), start_time, note.velocity());
                instrument.stop(stop_time);
            }
            selected.len()
        });

        match dispatched {
            Some(count) => count,
            None => {
                debug!(
                    "Track '{}' has no playable instrument, skipped {} note(s)",
                    self.name,
                    selected.len()
                );
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::mock::{Dispatch, DispatchLog, MockLoader};
    use crate::position::Tempo;
    use crate::scheduler::{DeferredScheduler, InlineScheduler};

    fn cursor_at(clock_time: f64) -> Cursor {
        let mut cursor = Cursor::new(Tempo::new(120.0).unwrap());
        cursor.reset(clock_time);
        cursor
    }

    fn piano(log: &DispatchLog) -> Track {
        Track::new("piano", Arc::new(MockLoader::new(log.clone())), &InlineScheduler)
    }

    #[test]
    fn test_notes_stay_ordered() {
        let log = DispatchLog::default();
        let mut track = piano(&log);
        for position in [1.0, 0.25, 3.5, 0.0] {
            track.add_note(Note::new("C4", position).unwrap());
        }
        let positions: Vec<f64> = track.notes().iter().map(|n| n.position()).collect();
        assert_eq!(positions, vec![0.0, 0.25, 1.0, 3.5]);
    }

    #[test]
    fn test_schedule_converts_to_clock_time() {
        let log = DispatchLog::default();
        let mut track = piano(&log);
        track.add_note(Note::new("E4", 0.25).unwrap());
        let mut cursor = cursor_at(10.0);
        cursor.advance();

        assert_eq!(track.schedule_slice(&cursor), 1);
        assert_eq!(
            log.for_instrument("piano"),
            vec![
                Dispatch::Play {
                    pitch: "E4".to_string(),
                    at: 10.5,
                    velocity: 100
                },
                Dispatch::Stop { at: 11.0 },
            ]
        );
    }

    #[test]
    fn test_only_current_beat_slice_is_selected() {
        let log = DispatchLog::default();
        let mut track = piano(&log);
        track.add_note(Note::new("C4", 0.0).unwrap());
        track.add_note(Note::new("D4", 0.125).unwrap());
        track.add_note(Note::new("E4", 0.25).unwrap());

        assert_eq!(track.schedule_slice(&cursor_at(0.0)), 2);
        let pitches: Vec<String> = log.plays().into_iter().map(|(_, p, _)| p).collect();
        assert_eq!(pitches, vec!["C4".to_string(), "D4".to_string()]);
    }

    #[test]
    fn test_muted_track_dispatches_nothing() {
        let log = DispatchLog::default();
        let mut track = piano(&log);
        track.add_note(Note::new("C4", 0.0).unwrap());
        track.settings.muted = true;

        assert_eq!(track.schedule_slice(&cursor_at(0.0)), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_unresolved_instrument_is_skipped() {
        let log = DispatchLog::default();
        let scheduler = DeferredScheduler::new();
        let mut track = Track::new("piano", Arc::new(MockLoader::new(log.clone())), &scheduler);
        track.add_note(Note::new("C4", 0.0).unwrap());

        assert_eq!(track.instrument_state(), SlotState::Pending);
        assert_eq!(track.schedule_slice(&cursor_at(0.0)), 0);
        assert!(log.is_empty());

        scheduler.run_pending();
        assert_eq!(track.schedule_slice(&cursor_at(0.0)), 1);
    }
}
