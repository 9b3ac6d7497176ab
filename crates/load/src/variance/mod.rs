//! Load-variance algorithms and scheduling.
//!
//! A variance program shapes the active worker count over a job's life.
//! Each program instruction names an algorithm that turns
//! `(duration, total workers, active workers)` into a timed sequence of
//! activation events; the scheduler applies the compiled sequence against
//! the job's activation flags.

pub mod argument;
pub mod linear;
pub mod program;
pub mod scheduler;
pub mod sine;
pub mod stairstep;

pub use argument::Adjustment;
pub use linear::LinearVarianceAlgorithm;
pub use program::{VarianceInstruction, VarianceProgram};
pub use scheduler::VarianceScheduler;
pub use sine::{SineShape, SineVarianceAlgorithm};
pub use stairstep::StairStepVarianceAlgorithm;

use crate::error::{LoadError, LoadResult};

/// One timed change to the active worker count: at `offset_ms` after the
/// variance start, change the count by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarianceEvent {
    pub offset_ms: u64,
    pub delta: i64,
}

impl VarianceEvent {
    pub fn new(offset_ms: u64, delta: i64) -> Self {
        Self { offset_ms, delta }
    }
}

/// A load-shape algorithm. Configured once from its string arguments at
/// program-parse time; `calculate` is a pure function thereafter.
pub trait VarianceAlgorithm: Send {
    /// The registered lowercase name.
    fn algorithm_name(&self) -> &'static str;

    /// Consumes the instruction's string arguments. Called exactly once.
    fn configure(&mut self, arguments: &[&str]) -> LoadResult<()>;

    /// Computes the event sequence for one program instruction.
    fn calculate(
        &self,
        duration_secs: u64,
        total_workers: usize,
        active_workers: usize,
    ) -> Vec<VarianceEvent>;
}

/// Creates an unconfigured algorithm by lowercase name.
pub fn algorithm_for_name(name: &str) -> LoadResult<Box<dyn VarianceAlgorithm>> {
    match name.to_lowercase().as_str() {
        "stairstep" => Ok(Box::new(StairStepVarianceAlgorithm::new())),
        "linear" => Ok(Box::new(LinearVarianceAlgorithm::new())),
        "sine" => Ok(Box::new(SineVarianceAlgorithm::new())),
        other => Err(LoadError::UnknownAlgorithm {
            name: other.to_string(),
        }),
    }
}
