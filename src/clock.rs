// clock.rs

use log::{debug, info};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Whether a clock source is currently advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Active,
    Suspended,
}

/// Monotonic time reference that absolute dispatch times are expressed in.
pub trait ClockSource: Send + Sync {
    /// Current time in seconds. Never decreases.
    fn now(&self) -> f64;
    fn state(&self) -> ClockState;
    /// Leaves the suspended state. No effect on an active clock.
    fn resume(&self);
}

/// Produces a clock source on demand. `None` means the host has no usable clock.
pub type ClockFactory = Box<dyn Fn() -> Option<Arc<dyn ClockSource>> + Send + Sync>;

pub fn system_clock_factory() -> ClockFactory {
    Box::new(|| Some(Arc::new(SystemClock::new()) as Arc<dyn ClockSource>))
}

/// Factory that hands out the same clock every time.
pub fn shared_clock_factory(clock: Arc<dyn ClockSource>) -> ClockFactory {
    Box::new(move || Some(clock.clone()))
}

struct SystemClockInner {
    origin: Instant,
    offset: f64,
    suspended_at: Option<f64>,
}

impl SystemClockInner {
    fn now(&self) -> f64 {
        match self.suspended_at {
            Some(frozen) => frozen,
            None => self.offset + self.origin.elapsed().as_secs_f64(),
        }
    }
}

/// Wall clock built on `Instant`. Time freezes while suspended and
/// continues from the frozen value after `resume`.
pub struct SystemClock {
    inner: Mutex<SystemClockInner>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        info!("Creating new SystemClock");
        SystemClock {
            inner: Mutex::new(SystemClockInner {
                origin: Instant::now(),
                offset: 0.0,
                suspended_at: None,
            }),
        }
    }

    pub fn suspend(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.suspended_at.is_none() {
            let frozen = inner.now();
            inner.suspended_at = Some(frozen);
            debug!("SystemClock suspended at {:.6}s", frozen);
        }
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> f64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .now()
    }

    fn state(&self) -> ClockState {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.suspended_at.is_some() {
            ClockState::Suspended
        } else {
            ClockState::Active
        }
    }

    fn resume(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(frozen) = inner.suspended_at.take() {
            inner.offset = frozen;
            inner.origin = Instant::now();
            debug!("SystemClock resumed at {:.6}s", frozen);
        }
    }
}

struct ManualClockInner {
    now: f64,
    state: ClockState,
    resume_count: u32,
    resume_latency: f64,
}

/// Clock whose time only moves when told to. Used to drive the lookahead
/// loop deterministically.
pub struct ManualClock {
    inner: Mutex<ManualClockInner>,
}

impl ManualClock {
    pub fn new(now: f64) -> Self {
        ManualClock {
            inner: Mutex::new(ManualClockInner {
                now,
                state: ClockState::Active,
                resume_count: 0,
                resume_latency: 0.0,
            }),
        }
    }

    /// A suspended clock that moves forward by `resume_latency` seconds when resumed.
    pub fn suspended(now: f64, resume_latency: f64) -> Self {
        let clock = Self::new(now);
        {
            let mut inner = clock.lock();
            inner.state = ClockState::Suspended;
            inner.resume_latency = resume_latency;
        }
        clock
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualClockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves time forward. Negative steps are ignored to keep the clock monotonic.
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            self.lock().now += seconds;
        }
    }

    pub fn set_now(&self, now: f64) {
        let mut inner = self.lock();
        if now > inner.now {
            inner.now = now;
        }
    }

    pub fn resume_count(&self) -> u32 {
        self.lock().resume_count
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> f64 {
        self.lock().now
    }

    fn state(&self) -> ClockState {
        self.lock().state
    }

    fn resume(&self) {
        let mut inner = self.lock();
        inner.resume_count += 1;
        if inner.state == ClockState::Suspended {
            inner.state = ClockState::Active;
            inner.now += inner.resume_latency;
        }
    }
}
