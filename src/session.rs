//! Sessions own the tracks, the scheduling cursor and the lookahead loop.
//!
//! A session is either stopped or running. [`Session::start`] anchors bar 0
//! beat 0 to the clock's current time, performs one firing immediately and
//! arms the [`LookaheadLoop`]; [`Session::stop`] cancels it. Starting a
//! running session restarts it from bar 0.

use crate::clock::{system_clock_factory, ClockFactory, ClockSource, ClockState};
use crate::config::{LookaheadConfig, SettingsError, PHRASE_LENGTH};
use crate::event_loop::LookaheadLoop;
use crate::instrument::InstrumentLoader;
use crate::note::{Note, NoteError};
use crate::position::Tempo;
use crate::scheduler::{Scheduler, ThreadScheduler};
use crate::state::{lock_state, FireReport, SessionState, SharedState};
use crate::track::Track;
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("tempo must be a positive BPM, got {0}")]
    InvalidTempo(f64),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("no track at index {0}")]
    TrackNotFound(usize),
    #[error(transparent)]
    Note(#[from] NoteError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub tempo: Tempo,
    pub lookahead: LookaheadConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetadata {
    pub created: DateTime<Local>,
    pub modified: DateTime<Local>,
}

impl SessionMetadata {
    fn new() -> Self {
        let now = Local::now();
        SessionMetadata {
            created: now,
            modified: now,
        }
    }

    fn touch(&mut self) {
        self.modified = Local::now();
    }
}

pub struct SessionBuilder {
    name: String,
    tempo: f64,
    lookahead: LookaheadConfig,
    instruments: Vec<String>,
    clock_factory: Option<ClockFactory>,
}

impl SessionBuilder {
    pub fn lookahead(mut self, lookahead: LookaheadConfig) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn instrument(mut self, id: impl Into<String>) -> Self {
        self.instruments.push(id.into());
        self
    }

    pub fn instruments<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.instruments.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Where the session gets its clock from on first `start()`. Defaults to
    /// a fresh [`SystemClock`](crate::clock::SystemClock).
    pub fn clock_factory(mut self, factory: ClockFactory) -> Self {
        self.clock_factory = Some(factory);
        self
    }

    /// Creates one track per instrument identifier, acquiring each
    /// instrument on `scheduler`.
    pub fn build<S: Scheduler>(
        self,
        loader: Arc<dyn InstrumentLoader>,
        scheduler: &S,
    ) -> Result<Session, SessionError> {
        let tempo = Tempo::new(self.tempo).ok_or(SessionError::InvalidTempo(self.tempo))?;
        self.lookahead.validate()?;

        let tracks = self
            .instruments
            .iter()
            .map(|id| Track::new(id, loader.clone(), scheduler))
            .collect();

        info!(
            "Creating session '{}' at {} with {} track(s)",
            self.name,
            tempo,
            self.instruments.len()
        );

        Ok(Session {
            name: self.name,
            settings: SessionSettings {
                tempo,
                lookahead: self.lookahead,
            },
            state: Arc::new(Mutex::new(SessionState::new(tempo, tracks))),
            loader,
            clock: None,
            clock_factory: self.clock_factory.unwrap_or_else(system_clock_factory),
            lookahead_loop: None,
            metadata: SessionMetadata::new(),
        })
    }
}

pub struct Session {
    name: String,
    settings: SessionSettings,
    state: SharedState,
    loader: Arc<dyn InstrumentLoader>,
    clock: Option<Arc<dyn ClockSource>>,
    clock_factory: ClockFactory,
    lookahead_loop: Option<LookaheadLoop>,
    metadata: SessionMetadata,
}

impl Session {
    pub fn builder(name: impl Into<String>, tempo: f64) -> SessionBuilder {
        SessionBuilder {
            name: name.into(),
            tempo,
            lookahead: LookaheadConfig::default(),
            instruments: Vec::new(),
            clock_factory: None,
        }
    }

    /// Session with default lookahead, the system clock, and instruments
    /// acquired on background threads.
    pub fn new(
        name: impl Into<String>,
        tempo: f64,
        instruments: &[&str],
        loader: Arc<dyn InstrumentLoader>,
    ) -> Result<Self, SessionError> {
        Self::builder(name, tempo)
            .instruments(instruments.iter().copied())
            .build(loader, &ThreadScheduler::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tempo(&self) -> Tempo {
        self.settings.tempo
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn clock(&self) -> Option<Arc<dyn ClockSource>> {
        self.clock.clone()
    }

    pub fn is_playing(&self) -> bool {
        lock_state(&self.state).is_playing()
    }

    pub fn track_count(&self) -> usize {
        lock_state(&self.state).tracks.len()
    }

    /// Adds a track for `instrument_id` and returns its index.
    pub fn add_track<S: Scheduler>(&mut self, instrument_id: &str, scheduler: &S) -> usize {
        let track = Track::new(instrument_id, self.loader.clone(), scheduler);
        let mut state = lock_state(&self.state);
        state.tracks.push(track);
        self.metadata.touch();
        debug!("Added track '{}' to session '{}'", instrument_id, self.name);
        state.tracks.len() - 1
    }

    pub fn add_note(&mut self, track_index: usize, note: Note) -> Result<(), SessionError> {
        let mut state = lock_state(&self.state);
        let track = state
            .tracks
            .get_mut(track_index)
            .ok_or(SessionError::TrackNotFound(track_index))?;
        track.add_note(note);
        self.metadata.touch();
        Ok(())
    }

    fn acquire_clock(&mut self) -> Option<Arc<dyn ClockSource>> {
        if self.clock.is_none() {
            self.clock = (self.clock_factory)();
            if self.clock.is_some() {
                info!("Clock source acquired for session '{}'", self.name);
            }
        }
        self.clock.clone()
    }

    /// Starts scheduling from bar 0 beat 0. Restarts if already running.
    /// Without a clock source this is a no-op.
    pub fn start(&mut self) {
        if let Some(armed) = self.lookahead_loop.take() {
            info!("Session '{}' already running, restarting", self.name);
            armed.cancel();
        }

        let Some(clock) = self.acquire_clock() else {
            warn!(
                "No clock source available, session '{}' not started",
                self.name
            );
            lock_state(&self.state).halt();
            return;
        };

        if clock.state() == ClockState::Suspended {
            info!("Clock source suspended, resuming");
            clock.resume();
        }

        let now = clock.now();
        {
            let mut state = lock_state(&self.state);
            state.begin(now);
            state.fire(now, &self.settings.lookahead);
        }

        match LookaheadLoop::spawn(self.state.clone(), clock, self.settings.lookahead) {
            Ok(armed) => {
                self.lookahead_loop = Some(armed);
                info!("Session '{}' started at {:.3}s", self.name, now);
            }
            Err(e) => {
                error!("Failed to arm lookahead loop: {}", e);
                lock_state(&self.state).halt();
            }
        }
    }

    /// Cancels the pending firing. No-op when stopped.
    pub fn stop(&mut self) {
        match self.lookahead_loop.take() {
            Some(armed) => {
                armed.cancel();
                info!("Session '{}' stopped", self.name);
            }
            None => debug!("Session '{}' already stopped", self.name),
        }
        lock_state(&self.state).halt();
    }

    /// Runs one lookahead firing now, on the calling thread.
    pub fn fire(&self) -> FireReport {
        match &self.clock {
            Some(clock) => {
                let now = clock.now();
                lock_state(&self.state).fire(now, &self.settings.lookahead)
            }
            None => FireReport::default(),
        }
    }

    /// The decimal position sounding right now, wrapped into the phrase.
    /// Measured in bars: 1.0 is one bar, 0.25 one beat.
    pub fn get_current_beat(&self) -> f64 {
        let state = lock_state(&self.state);
        let cursor = state.cursor();
        let decimal = cursor.position().decimal();
        match &self.clock {
            Some(clock) => {
                let elapsed_bars = (clock.now() - cursor.clock_time()) / self.settings.tempo.bar_length();
                (decimal + elapsed_bars).rem_euclid(PHRASE_LENGTH)
            }
            None => decimal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{shared_clock_factory, ManualClock};
    use crate::instrument::mock::{DispatchLog, MockLoader};
    use crate::scheduler::InlineScheduler;

    fn manual_session(clock: Arc<ManualClock>) -> Session {
        Session::builder("test", 120.0)
            .lookahead(LookaheadConfig {
                refresh_rate: 60_000,
                ..LookaheadConfig::default()
            })
            .instrument("piano")
            .clock_factory(shared_clock_factory(clock))
            .build(
                Arc::new(MockLoader::new(DispatchLog::default())),
                &InlineScheduler,
            )
            .unwrap()
    }

    #[test]
    fn test_rejects_invalid_tempo() {
        let result = Session::builder("bad", 0.0).build(
            Arc::new(MockLoader::new(DispatchLog::default())),
            &InlineScheduler,
        );
        assert!(matches!(result, Err(SessionError::InvalidTempo(_))));
    }

    #[test]
    fn test_current_beat_follows_clock() {
        let clock = Arc::new(ManualClock::new(10.0));
        let mut session = manual_session(clock.clone());
        assert_eq!(session.get_current_beat(), 0.0);

        session.start();
        assert_eq!(session.get_current_beat(), 0.0);

        clock.set_now(10.25);
        assert!((session.get_current_beat() - 0.125).abs() < 1e-9);

        clock.set_now(12.0);
        assert!((session.get_current_beat() - 1.0).abs() < 1e-9);
        session.stop();
    }

    #[test]
    fn test_add_note_updates_metadata() {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut session = manual_session(clock);
        let created = session.metadata().created;

        session.add_note(0, Note::new("C4", 0.0).unwrap()).unwrap();
        assert!(session.metadata().modified >= created);
        assert!(matches!(
            session.add_note(3, Note::new("C4", 0.0).unwrap()),
            Err(SessionError::TrackNotFound(3))
        ));
    }

    #[test]
    fn test_add_track_returns_index() {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut session = manual_session(clock);
        assert_eq!(session.add_track("bass", &InlineScheduler), 1);
        assert_eq!(session.track_count(), 2);
    }
}
