//! Tree-walking script interpreter.
//!
//! The interpreter drives a parsed script's instruction list against its
//! variable table. Stat trackers are started before the first instruction
//! and stopped after the last, even when execution ends early. The driver
//! polls the stop flag between top-level instructions; loops poll it on
//! every iteration.

use crate::error::{ScriptError, ScriptResult};
use crate::instruction::Flow;
use crate::parser::ParsedScript;
use crate::variables::StatContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cancellation and tracing state shared with the execution driver.
#[derive(Clone)]
pub struct ExecutionControl {
    stop_flag: Arc<AtomicBool>,
    debug: bool,
}

impl ExecutionControl {
    /// Creates a control with its own private stop flag.
    pub fn new() -> Self {
        Self {
            stop_flag: Arc::new(AtomicBool::new(false)),
            debug: false,
        }
    }

    /// Creates a control observing an externally owned stop flag.
    pub fn with_stop_flag(stop_flag: Arc<AtomicBool>) -> Self {
        Self {
            stop_flag,
            debug: false,
        }
    }

    /// Enables per-instruction debug tracing.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// True when the driver has requested a stop.
    pub fn should_stop(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    /// Requests that execution stop at the next check point.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// True when per-instruction tracing is enabled.
    pub fn debug_enabled(&self) -> bool {
        self.debug
    }
}

impl Default for ExecutionControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes parsed scripts.
pub struct Interpreter;

impl Interpreter {
    /// Runs the script once from top to bottom. Tracker start/stop frames
    /// the full execution, including early exits.
    pub fn run(
        script: &mut ParsedScript,
        control: &ExecutionControl,
        stats: &StatContext,
    ) -> ScriptResult<()> {
        script.variables.start_stat_trackers(stats);
        let result = Self::run_instructions(script, control);
        script.variables.stop_stat_trackers();
        result
    }

    fn run_instructions(
        script: &mut ParsedScript,
        control: &ExecutionControl,
    ) -> ScriptResult<()> {
        for instruction in &script.instructions {
            if control.should_stop() {
                info!("stop requested, ending script execution");
                return Ok(());
            }

            let flow = if control.debug_enabled() {
                instruction.debug_execute(&mut script.variables, control)?
            } else {
                instruction.execute(&mut script.variables, control)?
            };

            match flow {
                Flow::Normal => {}
                Flow::Stop => {
                    info!(
                        line = instruction.line(),
                        "stop requested inside instruction, ending script execution"
                    );
                    return Ok(());
                }
                Flow::Break => {
                    return Err(ScriptError::runtime(
                        instruction.line(),
                        "'break' used outside of a loop",
                    ))
                }
                Flow::Continue => {
                    return Err(ScriptError::runtime(
                        instruction.line(),
                        "'continue' used outside of a loop",
                    ))
                }
            }
        }
        debug!("script execution complete");
        Ok(())
    }
}
