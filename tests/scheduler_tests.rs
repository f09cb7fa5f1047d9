#[cfg(test)]
mod tests {
    use lookaheadrs::instrument::mock::{DispatchLog, MockLoader};
    use lookaheadrs::instrument::{resolve, SlotState};
    use lookaheadrs::scheduler::DeferredScheduler;
    use lookaheadrs::{create_scheduler, Scheduler};
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_multiple_scheduler_tasks() {
        let scheduler = create_scheduler();
        let task_count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let count = task_count.clone();
            scheduler.spawn(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(
            wait_for(|| task_count.load(Ordering::SeqCst) == 3),
            "All tasks should have completed"
        );
    }

    #[test]
    fn test_instrument_resolves_in_background() {
        let scheduler = create_scheduler();
        let loader = Arc::new(MockLoader::new(DispatchLog::default()));
        let slot = resolve("piano", loader, &scheduler);

        assert!(
            wait_for(|| slot.state() == SlotState::Ready),
            "Instrument should resolve on a background thread"
        );
    }

    #[test]
    fn test_failed_resolution_is_observable() {
        let scheduler = DeferredScheduler::new();
        let loader = Arc::new(MockLoader::new(DispatchLog::default()).failing("kazoo"));
        let slot = resolve("kazoo", loader, &scheduler);

        assert_eq!(slot.state(), SlotState::Pending);
        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(slot.state(), SlotState::Failed);
    }
}
