//! Variance control scheduler.
//!
//! A dedicated thread that walks the compiled event list and flips worker
//! activation flags at the right moments. Sleeps are capped at the
//! scheduler tick so stop requests are serviced promptly; events whose
//! time has passed are applied immediately, in list order. With looping
//! enabled the schedule rebases and restarts when it runs out.

use super::VarianceEvent;
use crate::job::JobContext;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use stampede_config::SCHEDULER_TICK_MS;
use tracing::{debug, info};

/// Drives a compiled variance timeline against a job's activation flags.
pub struct VarianceScheduler;

impl VarianceScheduler {
    /// Starts the scheduler thread for the given job.
    ///
    /// An empty event list means the job has no variance program: every
    /// worker is activated immediately and the thread exits. On stop, all
    /// activation flags are cleared.
    pub fn spawn(
        job: Arc<JobContext>,
        events: Vec<VarianceEvent>,
        loop_program: bool,
    ) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("variance-scheduler".to_string())
            .spawn(move || Self::run(&job, &events, loop_program))
            .expect("failed to spawn variance scheduler thread")
    }

    fn run(job: &JobContext, events: &[VarianceEvent], loop_program: bool) {
        let tick = Duration::from_millis(SCHEDULER_TICK_MS);
        job.wait_for_workers(tick);
        if job.stop_requested() {
            job.set_all_inactive();
            return;
        }

        if events.is_empty() {
            info!(workers = job.worker_count(), "no variance program, activating all workers");
            job.set_all_active();
            return;
        }

        info!(
            events = events.len(),
            loop_program, "variance schedule started"
        );
        let mut job_start = Instant::now();
        let mut slot_pos = 0;

        loop {
            if job.stop_requested() {
                break;
            }

            if slot_pos >= events.len() {
                if loop_program {
                    debug!("variance schedule looping");
                    slot_pos = 0;
                    job_start = Instant::now();
                    continue;
                }
                debug!("variance schedule complete");
                return;
            }

            let event = events[slot_pos];
            let target = job_start + Duration::from_millis(event.offset_ms);
            let now = Instant::now();
            if now >= target {
                job.apply_delta(event.delta);
                slot_pos += 1;
                continue;
            }

            std::thread::sleep((target - now).min(tick));
        }

        // Stop requested: quiesce every worker.
        job.set_all_inactive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(workers: usize) -> Arc<JobContext> {
        let job = Arc::new(JobContext::new(
            workers,
            Duration::from_millis(10),
            "scheduler-test",
        ));
        // No real workers in these tests; release the start handshake.
        for _ in 0..workers {
            job.worker_ready();
        }
        job
    }

    fn wait_for<F: Fn() -> bool>(what: &str, predicate: F) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !predicate() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_empty_program_activates_all() {
        let job = job(4);
        let handle = VarianceScheduler::spawn(job.clone(), Vec::new(), false);
        handle.join().unwrap();
        assert_eq!(job.active_count(), 4);
    }

    #[test]
    fn test_events_applied_in_order() {
        let job = job(5);
        let events = vec![
            VarianceEvent::new(0, 3),
            VarianceEvent::new(30, -1),
            VarianceEvent::new(60, 2),
        ];
        let handle = VarianceScheduler::spawn(job.clone(), events, false);
        handle.join().unwrap();
        assert_eq!(job.active_count(), 4);
    }

    #[test]
    fn test_same_offset_events_apply_in_list_order() {
        let job = job(3);
        // Net zero at one instant, then a final activation.
        let events = vec![
            VarianceEvent::new(0, 2),
            VarianceEvent::new(0, -2),
            VarianceEvent::new(20, 1),
        ];
        let handle = VarianceScheduler::spawn(job.clone(), events, false);
        handle.join().unwrap();
        assert_eq!(job.active_count(), 1);
    }

    #[test]
    fn test_past_offsets_apply_immediately() {
        let job = job(2);
        // Both events are nominally in the past by the time the thread
        // starts; they must still land, in order.
        let events = vec![VarianceEvent::new(0, 2), VarianceEvent::new(0, -1)];
        let handle = VarianceScheduler::spawn(job.clone(), events, false);
        handle.join().unwrap();
        assert_eq!(job.active_count(), 1);
    }

    #[test]
    fn test_stop_clears_all_flags() {
        let job = job(4);
        // A schedule that keeps the thread alive long enough to stop it.
        let events = vec![
            VarianceEvent::new(0, 4),
            VarianceEvent::new(60_000, -1),
        ];
        let handle = VarianceScheduler::spawn(job.clone(), events, false);
        wait_for("workers to activate", || job.active_count() == 4);
        job.request_stop();
        handle.join().unwrap();
        assert_eq!(job.active_count(), 0);
    }

    #[test]
    fn test_looping_rebases_schedule() {
        let job = job(2);
        // Each pass turns both workers on and off again.
        let events = vec![VarianceEvent::new(0, 2), VarianceEvent::new(20, -2)];
        let handle = VarianceScheduler::spawn(job.clone(), events, true);

        // Observe at least two activation pulses.
        wait_for("first pulse", || job.active_count() == 2);
        wait_for("first drain", || job.active_count() == 0);
        wait_for("second pulse", || job.active_count() == 2);

        job.request_stop();
        handle.join().unwrap();
        assert_eq!(job.active_count(), 0);
    }
}
