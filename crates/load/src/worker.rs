//! Worker-thread runtime.
//!
//! A job runs N workers, each an OS thread driving user-supplied callbacks:
//! `startup` once, `per_iteration` while the worker's activation flag is
//! on, and `shutdown` on the way out. Workers never block indefinitely: an
//! inactive worker sleeps the configured idle interval and rechecks its
//! flag, and every iteration boundary observes the stop flag.

use crate::job::JobContext;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// A worker's view of its job: its index and the shared flags.
pub struct WorkerContext {
    job: Arc<JobContext>,
    index: usize,
}

impl WorkerContext {
    /// This worker's slot number.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The owning job.
    pub fn job(&self) -> &JobContext {
        &self.job
    }

    /// True when the iteration body should return: the worker's flag went
    /// off, or the job is stopping. Long-running iteration bodies call
    /// this periodically.
    pub fn should_pause_or_stop(&self) -> bool {
        self.job.should_pause_or_stop(self.index)
    }
}

/// The callbacks one worker runs.
pub trait Worker: Send {
    /// Runs once before the worker enters its loop.
    fn startup(&mut self, _ctx: &WorkerContext) {}

    /// Runs immediately before each iteration.
    fn per_iteration_pre(&mut self, _ctx: &WorkerContext) {}

    /// One unit of workload. Returning while still active is legitimate;
    /// the loop re-invokes it.
    fn per_iteration(&mut self, ctx: &WorkerContext);

    /// Runs immediately after each iteration.
    fn per_iteration_post(&mut self, _ctx: &WorkerContext) {}

    /// Runs once after the worker leaves its loop.
    fn shutdown(&mut self, _ctx: &WorkerContext) {}
}

/// The threads of one running job.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts one thread per worker slot. The factory builds each worker's
    /// private callback state; nothing is shared between workers.
    pub fn start<W, F>(job: Arc<JobContext>, factory: F) -> Self
    where
        W: Worker + 'static,
        F: Fn(usize) -> W,
    {
        let handles = (0..job.worker_count())
            .map(|index| {
                let worker = factory(index);
                let context = WorkerContext {
                    job: job.clone(),
                    index,
                };
                std::thread::Builder::new()
                    .name(format!("worker-{}", index))
                    .spawn(move || run_worker(worker, context))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self { handles }
    }

    /// Number of worker threads.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True when the pool has no workers.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to finish.
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                warn!("worker thread panicked");
            }
        }
    }
}

fn run_worker<W: Worker>(mut worker: W, context: WorkerContext) {
    let job = context.job.clone();
    worker.startup(&context);
    job.worker_ready();
    debug!(worker = context.index, "worker started");

    loop {
        if job.stop_requested() {
            break;
        }
        if job.is_active(context.index) {
            worker.per_iteration_pre(&context);
            worker.per_iteration(&context);
            worker.per_iteration_post(&context);
        } else {
            std::thread::sleep(job.idle_sleep());
        }
    }

    worker.shutdown(&context);
    debug!(worker = context.index, "worker finished");
}
