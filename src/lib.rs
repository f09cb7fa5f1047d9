pub mod automation;
pub mod cli;
pub mod clock;
pub mod config;
pub mod demo;
pub mod event_loop;
pub mod instrument;
pub mod logging;
pub mod midi_output;
pub mod note;
pub mod pitch;
pub mod position;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod track;
pub mod ui;

pub use cli::Args;
pub use clock::{ClockSource, ClockState, ManualClock, SystemClock};
pub use config::{LookaheadConfig, Settings};
pub use instrument::{Instrument, InstrumentError, InstrumentLoader};
pub use note::Note;
pub use position::{Cursor, MusicalPosition, Tempo};
pub use scheduler::{Scheduler, ThreadScheduler};
pub use session::{Session, SessionError};
pub use state::{FireReport, SharedState, TransportState};
pub use track::Track;

pub fn create_scheduler() -> ThreadScheduler {
    ThreadScheduler::new()
}

pub fn handle_device_list() -> Vec<String> {
    midi_output::list_output_ports().unwrap_or_else(|e| {
        log::error!("Failed to list MIDI output ports: {}", e);
        Vec::new()
    })
}
