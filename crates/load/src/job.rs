//! Per-job shared state.
//!
//! A `JobContext` owns everything one client process shares between its
//! variance scheduler and its workers: the activation flags, the stop
//! flag, and the start handshake. The scheduler is the only writer of the
//! activation flags; workers only read them.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Shared state for one running job.
pub struct JobContext {
    /// Worker activation flags, indexed by worker number. Written only by
    /// the variance scheduler.
    active: Box<[AtomicBool]>,
    /// Set once to end the job.
    stop_requested: AtomicBool,
    /// Sleep applied by an inactive worker before rechecking its flag.
    idle_sleep: Duration,
    /// Workers that have not yet finished `startup`.
    workers_pending: Mutex<usize>,
    workers_started: Condvar,
    /// Identity reported into stat trackers.
    client_id: String,
}

impl JobContext {
    /// Creates the context for a job with the given worker count. All
    /// activation flags start false.
    pub fn new(workers: usize, idle_sleep: Duration, client_id: impl Into<String>) -> Self {
        let active = (0..workers)
            .map(|_| AtomicBool::new(false))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            active,
            stop_requested: AtomicBool::new(false),
            idle_sleep,
            workers_pending: Mutex::new(workers),
            workers_started: Condvar::new(),
            client_id: client_id.into(),
        }
    }

    /// Number of worker slots.
    pub fn worker_count(&self) -> usize {
        self.active.len()
    }

    /// The identity reported into stat trackers.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Sleep applied by an inactive worker.
    pub fn idle_sleep(&self) -> Duration {
        self.idle_sleep
    }

    /// True when the worker at `index` should be executing iterations.
    pub fn is_active(&self, index: usize) -> bool {
        self.active[index].load(Ordering::Relaxed)
    }

    /// True once the job has been told to end.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Relaxed)
    }

    /// Tells every participant to wind down.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Relaxed);
        self.workers_started.notify_all();
    }

    /// True when the worker at `index` should leave its iteration body:
    /// its flag went off, or the job is stopping.
    pub fn should_pause_or_stop(&self, index: usize) -> bool {
        self.stop_requested() || !self.is_active(index)
    }

    /// Number of currently active workers.
    pub fn active_count(&self) -> usize {
        self.active
            .iter()
            .filter(|flag| flag.load(Ordering::Relaxed))
            .count()
    }

    /// Called by each worker once its `startup` has finished.
    pub(crate) fn worker_ready(&self) {
        let mut pending = self.workers_pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.workers_started.notify_all();
        }
    }

    /// Blocks until every worker has signalled readiness, or the job is
    /// stopped. Waits are bounded so a stop request is always noticed.
    pub(crate) fn wait_for_workers(&self, check_interval: Duration) {
        let mut pending = self.workers_pending.lock();
        while *pending > 0 && !self.stop_requested() {
            let _ = self.workers_started.wait_for(&mut pending, check_interval);
        }
    }

    /// Turns on up to `count` inactive slots, lowest index first. Returns
    /// the number actually changed.
    pub(crate) fn activate(&self, count: usize) -> usize {
        let mut changed = 0;
        for flag in self.active.iter() {
            if changed == count {
                break;
            }
            if !flag.load(Ordering::Relaxed) {
                flag.store(true, Ordering::Relaxed);
                changed += 1;
            }
        }
        changed
    }

    /// Turns off up to `count` active slots, highest index first. Returns
    /// the number actually changed.
    pub(crate) fn deactivate(&self, count: usize) -> usize {
        let mut changed = 0;
        for flag in self.active.iter().rev() {
            if changed == count {
                break;
            }
            if flag.load(Ordering::Relaxed) {
                flag.store(false, Ordering::Relaxed);
                changed += 1;
            }
        }
        changed
    }

    /// Applies one variance event's delta. Out-of-range changes clamp
    /// silently: the number of active workers always stays in
    /// `[0, worker_count]`.
    pub(crate) fn apply_delta(&self, delta: i64) {
        if delta > 0 {
            let changed = self.activate(delta as usize);
            debug!(requested = delta, changed, "activated workers");
        } else if delta < 0 {
            let changed = self.deactivate(delta.unsigned_abs() as usize);
            debug!(requested = delta, changed, "deactivated workers");
        }
    }

    /// Turns every slot on.
    pub(crate) fn set_all_active(&self) {
        for flag in self.active.iter() {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Turns every slot off.
    pub(crate) fn set_all_inactive(&self) {
        for flag in self.active.iter() {
            flag.store(false, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(workers: usize) -> JobContext {
        JobContext::new(workers, Duration::from_millis(100), "test-client")
    }

    #[test]
    fn test_flags_start_false() {
        let job = context(4);
        assert_eq!(job.active_count(), 0);
        assert!(!job.is_active(0));
        assert!(job.should_pause_or_stop(0));
    }

    #[test]
    fn test_activate_lowest_first() {
        let job = context(4);
        assert_eq!(job.activate(2), 2);
        assert!(job.is_active(0));
        assert!(job.is_active(1));
        assert!(!job.is_active(2));
    }

    #[test]
    fn test_deactivate_highest_first() {
        let job = context(4);
        job.set_all_active();
        assert_eq!(job.deactivate(2), 2);
        assert!(job.is_active(0));
        assert!(job.is_active(1));
        assert!(!job.is_active(2));
        assert!(!job.is_active(3));
    }

    #[test]
    fn test_apply_delta_clamps() {
        let job = context(3);
        job.apply_delta(10);
        assert_eq!(job.active_count(), 3);
        job.apply_delta(-100);
        assert_eq!(job.active_count(), 0);
    }

    #[test]
    fn test_idempotent_flag_writes() {
        let job = context(2);
        job.apply_delta(2);
        let before = job.active_count();
        // Re-applying an activation over already-active slots changes
        // nothing a worker can observe.
        assert_eq!(job.activate(2), 0);
        assert_eq!(job.active_count(), before);
    }

    #[test]
    fn test_stop_wakes_waiters() {
        let job = std::sync::Arc::new(context(1));
        let waiter = {
            let job = job.clone();
            std::thread::spawn(move || {
                job.wait_for_workers(Duration::from_millis(50));
            })
        };
        job.request_stop();
        waiter.join().unwrap();
    }
}
