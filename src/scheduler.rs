use std::sync::{Mutex, PoisonError};
use std::thread;

/// Runs background tasks such as instrument acquisition.
pub trait Scheduler {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static;
}

/// One thread per task.
pub struct ThreadScheduler;

impl ThreadScheduler {
    pub fn new() -> Self {
        ThreadScheduler
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ThreadScheduler {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let _ = thread::spawn(f);
    }
}

/// Runs each task immediately on the calling thread.
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        f();
    }
}

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Queues tasks until [`DeferredScheduler::run_pending`] is called.
#[derive(Default)]
pub struct DeferredScheduler {
    tasks: Mutex<Vec<Task>>,
}

impl DeferredScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs every queued task in spawn order and returns how many ran.
    pub fn run_pending(&self) -> usize {
        let tasks: Vec<Task> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl Scheduler for DeferredScheduler {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(f));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_thread_scheduler_spawn() {
        let scheduler = ThreadScheduler::new();
        let flag = Arc::new(Mutex::new(false));
        let flag_clone = flag.clone();

        scheduler.spawn(move || {
            let mut flag = flag_clone.lock().unwrap();
            *flag = true;
        });

        // Give the thread a moment to execute
        thread::sleep(Duration::from_millis(10));
        assert!(*flag.lock().unwrap());
    }

    #[test]
    fn test_inline_scheduler_runs_before_returning() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        InlineScheduler.spawn(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deferred_scheduler_holds_tasks() {
        let scheduler = DeferredScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            scheduler.spawn(move || order.lock().unwrap().push(i));
        }

        assert_eq!(scheduler.pending(), 3);
        assert!(order.lock().unwrap().is_empty());

        assert_eq!(scheduler.run_pending(), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(scheduler.pending(), 0);
    }
}
