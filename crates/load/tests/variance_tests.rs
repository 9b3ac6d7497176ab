//! Integration tests: a compiled variance program driving a live worker
//! pool.

use stampede_load::{
    JobContext, VarianceProgram, VarianceScheduler, Worker, WorkerContext, WorkerPool,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct TickWorker {
    ticks: Arc<AtomicUsize>,
}

impl Worker for TickWorker {
    fn per_iteration(&mut self, ctx: &WorkerContext) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        while !ctx.should_pause_or_stop() {
            std::thread::sleep(Duration::from_millis(1));
            break;
        }
    }
}

fn wait_for<F: Fn() -> bool>(what: &str, predicate: F) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !predicate() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_program_drives_worker_pool() {
    let job = Arc::new(JobContext::new(
        4,
        Duration::from_millis(5),
        "variance-integration",
    ));
    let ticks = Arc::new(AtomicUsize::new(0));

    let pool = {
        let ticks = ticks.clone();
        WorkerPool::start(job.clone(), move |_| TickWorker {
            ticks: ticks.clone(),
        })
    };

    // Everything on immediately, everything off after a quarter second.
    let program = VarianceProgram::parse("0\t0\tstairstep\t=100%\n").unwrap();
    let events = program.compile(job.worker_count(), 0);
    let scheduler = VarianceScheduler::spawn(job.clone(), events, false);

    wait_for("all workers active", || job.active_count() == 4);
    wait_for("iterations observed", || ticks.load(Ordering::Relaxed) > 20);

    job.request_stop();
    scheduler.join().unwrap();
    pool.join();
    assert_eq!(job.active_count(), 0);
}

#[test]
fn test_compiled_invariants_hold_for_every_algorithm() {
    let program = VarianceProgram::parse(
        "0\t2\tlinear\t+50%\n1\t2\tsine\tconcave\t=100%\n0\t1\tlinear\t-6\n0\t0\tstairstep\t=0\n",
    )
    .unwrap();
    let total = 12;
    let events = program.compile(total, 0);

    let mut active: i64 = 0;
    let mut last_offset = 0;
    for event in &events {
        assert!(event.offset_ms >= last_offset, "offsets must not regress");
        last_offset = event.offset_ms;
        active += event.delta;
        assert!((0..=total as i64).contains(&active));
    }
    // The program ends with a stair-step back to zero.
    assert_eq!(active, 0);
}

#[test]
fn test_stop_request_quiesces_within_bound() {
    let job = Arc::new(JobContext::new(
        2,
        Duration::from_millis(5),
        "variance-integration",
    ));
    let ticks = Arc::new(AtomicUsize::new(0));
    let pool = {
        let ticks = ticks.clone();
        WorkerPool::start(job.clone(), move |_| TickWorker {
            ticks: ticks.clone(),
        })
    };
    let events = VarianceProgram::parse("0\t0\tstairstep\t=100%\n")
        .unwrap()
        .compile(2, 0);
    let scheduler = VarianceScheduler::spawn(job.clone(), events, false);

    wait_for("workers running", || ticks.load(Ordering::Relaxed) > 0);

    let stop_started = Instant::now();
    job.request_stop();
    scheduler.join().unwrap();
    pool.join();
    // Idle sleep is 5ms and iterations are short; the whole job must wind
    // down well inside the blocking bound.
    assert!(stop_started.elapsed() < Duration::from_secs(5));
}
