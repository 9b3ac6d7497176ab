//! Load shaping and the worker runtime for the stampede engine.
//!
//! This crate owns everything a client process uses to run a job: the
//! variance algorithms that turn load-shape directives into timed event
//! sequences, the scheduler that applies those events to worker activation
//! flags, the worker-thread pool itself, and the per-job `JobContext`
//! holding the state they share.

pub mod error;
pub mod job;
pub mod variance;
pub mod worker;

pub use error::{LoadError, LoadResult};
pub use job::JobContext;
pub use variance::{
    algorithm_for_name, Adjustment, VarianceAlgorithm, VarianceEvent, VarianceProgram,
    VarianceScheduler,
};
pub use worker::{Worker, WorkerContext, WorkerPool};
