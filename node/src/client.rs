//! The stampede client process.
//!
//! Runs one scripted workload: parses the script, compiles the variance
//! program, starts the worker pool, and lets the variance scheduler shape
//! the active worker count until the duration elapses or an interrupt
//! arrives. Collected stat trackers are printed on the way out.

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use stampede_config::{ClientJobConfig, DEFAULT_IDLE_SLEEP_MS};
use stampede_load::{
    JobContext, VarianceProgram, VarianceScheduler, Worker, WorkerContext, WorkerPool,
};
use stampede_script::{
    parse_script, ExecutionControl, Interpreter, ParsedScript, StatContext, StatTracker,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "stampede-client",
    about = "Stampede client: runs one scripted workload on a pool of workers"
)]
struct Cli {
    /// Path to the workload script.
    #[arg(long, value_name = "PATH")]
    script: PathBuf,

    /// Path to the tab-delimited variance program. Without one, every
    /// worker activates at job start.
    #[arg(long, value_name = "PATH")]
    variance: Option<PathBuf>,

    /// Number of worker threads.
    #[arg(long, default_value_t = 10, value_name = "COUNT")]
    workers: usize,

    /// Restart the variance program from the beginning when it runs out.
    #[arg(long)]
    loop_variance: bool,

    /// Job duration in seconds. Zero runs until interrupted.
    #[arg(long, default_value_t = 0, value_name = "SECONDS")]
    duration: u64,

    /// Sleep for inactive workers, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_IDLE_SLEEP_MS, value_name = "MILLIS")]
    idle_sleep: u64,

    /// Identity reported into stat trackers.
    #[arg(long, default_value = "standalone", value_name = "ID")]
    client_id: String,

    /// Trace every script instruction as it executes.
    #[arg(long)]
    debug_script: bool,
}

/// A worker that runs one interpreter pass per iteration over its private
/// copy of the parsed script.
struct ScriptWorker {
    script: ParsedScript,
    control: ExecutionControl,
    stats: StatContext,
    collected: Arc<Mutex<Vec<StatTracker>>>,
    failed: bool,
}

impl Worker for ScriptWorker {
    fn per_iteration(&mut self, ctx: &WorkerContext) {
        if self.failed {
            // A script that errored once will error every pass; idle
            // instead of spinning on the same failure.
            std::thread::sleep(ctx.job().idle_sleep());
            return;
        }
        if let Err(e) = Interpreter::run(&mut self.script, &self.control, &self.stats) {
            warn!(worker = ctx.index(), error = %e, "script failed");
            self.failed = true;
        }
    }

    fn shutdown(&mut self, _ctx: &WorkerContext) {
        let trackers = self.script.variables.collect_stat_trackers();
        self.collected.lock().extend(trackers);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientJobConfig {
        workers: cli.workers,
        idle_sleep_ms: cli.idle_sleep,
        loop_variance: cli.loop_variance,
        script_file: cli.script.display().to_string(),
        variance_file: cli.variance.as_ref().map(|p| p.display().to_string()),
        duration_secs: cli.duration,
    };
    if config.workers == 0 {
        bail!("at least one worker is required");
    }

    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("reading script {}", cli.script.display()))?;
    // Parse once up front so script errors surface before any threads
    // start; each worker then parses its own private copy.
    parse_script(&source).context("parsing workload script")?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(stop_flag.clone())?;

    let trackers = run_job(&config, &source, &cli.client_id, cli.debug_script, stop_flag)?;

    println!("--- job statistics ---");
    if trackers.is_empty() {
        println!("(no stat trackers collected)");
    }
    for tracker in trackers {
        println!(
            "[{} thread {}] {}",
            tracker.client_id(),
            tracker.thread_id(),
            tracker.summary_string()
        );
    }
    Ok(())
}

fn run_job(
    config: &ClientJobConfig,
    source: &str,
    client_id: &str,
    debug_script: bool,
    stop_flag: Arc<AtomicBool>,
) -> Result<Vec<StatTracker>> {
    let job = Arc::new(JobContext::new(
        config.workers,
        config.idle_sleep(),
        client_id,
    ));

    let program = match &config.variance_file {
        Some(path) => VarianceProgram::from_file(path).context("parsing variance program")?,
        None => VarianceProgram::empty(),
    };
    let events = program.compile(config.workers, 0);
    info!(
        workers = config.workers,
        events = events.len(),
        "starting job"
    );

    let collected = Arc::new(Mutex::new(Vec::new()));
    let pool = {
        let source = source.to_string();
        let client_id = client_id.to_string();
        let stop_flag = stop_flag.clone();
        let collected = collected.clone();
        WorkerPool::start(job.clone(), move |index| {
            // The source already parsed once in main, so this cannot fail.
            let script = parse_script(&source).expect("validated script");
            ScriptWorker {
                script,
                control: ExecutionControl::with_stop_flag(stop_flag.clone())
                    .with_debug(debug_script),
                stats: StatContext::new(client_id.clone(), index),
                collected: collected.clone(),
                failed: false,
            }
        })
    };

    let scheduler = VarianceScheduler::spawn(job.clone(), events, config.loop_variance);

    // Wait out the duration, or an interrupt.
    let started = std::time::Instant::now();
    loop {
        if stop_flag.load(Ordering::Relaxed) {
            break;
        }
        if config.duration_secs > 0
            && started.elapsed() >= Duration::from_secs(config.duration_secs)
        {
            info!("job duration elapsed");
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    // Stop the interpreter passes as well as the worker loops.
    stop_flag.store(true, Ordering::Relaxed);
    job.request_stop();
    if scheduler.join().is_err() {
        warn!("variance scheduler panicked");
    }
    pool.join();

    let trackers = std::mem::take(&mut *collected.lock());
    Ok(trackers)
}

/// Routes SIGINT to the job's stop flag. The handler lives on a small
/// dedicated runtime so the job itself can stay on plain threads.
fn install_interrupt_handler(stop_flag: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;
    std::thread::spawn(move || {
        runtime.block_on(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping job");
                stop_flag.store(true, Ordering::Relaxed);
            }
        });
    });
    Ok(())
}
