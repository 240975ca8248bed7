//! CI pipeline orchestration.
//!
//! Reproduces the pipeline's job-orchestration policy as a library: a
//! cancellable-run registry keyed by branch identity, per-job admission
//! control, matrix fan-out, credential-scoped steps, and unconditional cache
//! cleanup. Jobs and matrix cells are independently scheduled units — no job
//! observes another's state, and the concurrency group is the only cross-run
//! ordering constraint.

pub mod concurrency;
pub mod event;
pub mod runner;
pub mod secrets;
pub mod workflow;

pub use runner::{CellReport, JobReport, Orchestrator, Outcome, RunReport};
