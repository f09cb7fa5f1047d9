// event_loop.rs

use crate::clock::ClockSource;
use crate::config::LookaheadConfig;
use crate::state::{lock_state, SharedState};
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use log::{debug, error, info};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// The armed lookahead loop of a running session.
///
/// Owning this value is owning the pending re-arm: dropping or cancelling it
/// stops further firings and joins the loop thread.
pub struct LookaheadLoop {
    cancel_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl LookaheadLoop {
    /// Arms a loop that fires every `lookahead.refresh_rate` milliseconds.
    /// The first firing happens one refresh interval from now.
    pub fn spawn(
        state: SharedState,
        clock: Arc<dyn ClockSource>,
        lookahead: LookaheadConfig,
    ) -> io::Result<Self> {
        let (cancel_tx, cancel_rx) = channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("lookahead".to_string())
            .spawn(move || {
                info!(
                    "Lookahead loop started (range {:.3}s, refresh {} ms)",
                    lookahead.range, lookahead.refresh_rate
                );
                let interval = lookahead.refresh_interval();
                loop {
                    match cancel_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let now = clock.now();
                            lock_state(&state).fire(now, &lookahead);
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("Lookahead loop stopped");
            })?;

        Ok(LookaheadLoop {
            cancel_tx,
            handle: Some(handle),
        })
    }

    /// Cancels the pending firing and waits for the loop thread to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.cancel_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                debug!("Lookahead loop cancelled from its own thread, not joining");
                return;
            }
            if handle.join().is_err() {
                error!("Lookahead loop thread panicked");
            }
        }
    }
}

impl Drop for LookaheadLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
