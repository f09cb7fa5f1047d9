use crate::config::LookaheadConfig;
use crate::position::{Cursor, Tempo};
use crate::track::Track;
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

/// What a single lookahead firing did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FireReport {
    pub beats_scheduled: u32,
    pub notes_dispatched: usize,
}

/// Cursor and tracks of one session. Only the session's lookahead firing
/// mutates the cursor.
pub struct SessionState {
    pub tracks: Vec<Track>,
    cursor: Cursor,
    transport: TransportState,
}

pub type SharedState = Arc<Mutex<SessionState>>;

pub fn lock_state(state: &SharedState) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionState {
    pub fn new(tempo: Tempo, tracks: Vec<Track>) -> Self {
        SessionState {
            tracks,
            cursor: Cursor::new(tempo),
            transport: TransportState::Stopped,
        }
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport == TransportState::Running
    }

    /// Re-anchors the cursor at bar 0 beat 0 and marks the transport running.
    pub(crate) fn begin(&mut self, now: f64) {
        self.cursor.reset(now);
        self.transport = TransportState::Running;
    }

    pub(crate) fn halt(&mut self) {
        self.transport = TransportState::Stopped;
    }

    /// Dispatches every track's notes in the cursor's current beat slice.
    /// The cursor is left untouched.
    pub fn schedule(&self) -> usize {
        self.tracks
            .iter()
            .map(|track| track.schedule_slice(&self.cursor))
            .sum()
    }

    /// One lookahead firing at clock time `now`.
    ///
    /// Schedules and advances while the cursor lies inside the lookahead
    /// horizon, so a late firing catches up on the beats it missed, up to
    /// `max_catch_up_beats` per call.
    pub fn fire(&mut self, now: f64, lookahead: &LookaheadConfig) -> FireReport {
        let mut report = FireReport::default();
        if !self.is_playing() {
            return report;
        }

        let horizon = now + lookahead.range;
        while self.cursor.clock_time() < horizon {
            if report.beats_scheduled == lookahead.max_catch_up_beats {
                warn!(
                    "Lookahead fell behind: cursor at {:.3}s, horizon {:.3}s; continuing next firing",
                    self.cursor.clock_time(),
                    horizon
                );
                break;
            }
            report.notes_dispatched += self.schedule();
            self.cursor.advance();
            report.beats_scheduled += 1;
        }

        if report.beats_scheduled > 0 {
            debug!(
                "Firing at {:.3}s scheduled {} beat(s), {} note(s); next beat {} at {:.3}s",
                now,
                report.beats_scheduled,
                report.notes_dispatched,
                self.cursor.position(),
                self.cursor.clock_time()
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::mock::{DispatchLog, MockLoader};
    use crate::note::Note;
    use crate::position::MusicalPosition;
    use crate::scheduler::InlineScheduler;

    fn state_with_note(log: &DispatchLog, position: f64) -> SessionState {
        let loader = Arc::new(MockLoader::new(log.clone()));
        let mut track = Track::new("piano", loader, &InlineScheduler);
        track.add_note(Note::new("C4", position).unwrap());
        SessionState::new(Tempo::new(120.0).unwrap(), vec![track])
    }

    #[test]
    fn test_stopped_state_never_fires() {
        let log = DispatchLog::default();
        let mut state = state_with_note(&log, 0.0);
        let report = state.fire(0.0, &LookaheadConfig::default());
        assert_eq!(report, FireReport::default());
        assert!(log.is_empty());
    }

    #[test]
    fn test_single_beat_per_on_time_firing() {
        let log = DispatchLog::default();
        let mut state = state_with_note(&log, 0.0);
        state.begin(1.0);

        let report = state.fire(1.0, &LookaheadConfig::default());
        assert_eq!(report.beats_scheduled, 1);
        assert_eq!(report.notes_dispatched, 1);
        assert_eq!(state.cursor().position(), MusicalPosition::new(0, 1));
        assert_eq!(state.cursor().clock_time(), 1.5);

        // Cursor is now beyond the horizon
        let report = state.fire(1.025, &LookaheadConfig::default());
        assert_eq!(report.beats_scheduled, 0);
    }

    #[test]
    fn test_late_firing_catches_up() {
        let log = DispatchLog::default();
        let mut state = state_with_note(&log, 0.5);
        state.begin(0.0);

        // 1.2s late at 120 BPM: beats at 0.0, 0.5, 1.0 are inside the horizon
        let report = state.fire(1.2, &LookaheadConfig::default());
        assert_eq!(report.beats_scheduled, 3);
        assert_eq!(report.notes_dispatched, 1);
        assert_eq!(state.cursor().clock_time(), 1.5);
    }

    #[test]
    fn test_catch_up_is_bounded() {
        let log = DispatchLog::default();
        let mut state = state_with_note(&log, 0.0);
        state.begin(0.0);
        let lookahead = LookaheadConfig {
            max_catch_up_beats: 4,
            ..LookaheadConfig::default()
        };

        let report = state.fire(100.0, &lookahead);
        assert_eq!(report.beats_scheduled, 4);
        assert_eq!(state.cursor().clock_time(), 2.0);
    }
}
