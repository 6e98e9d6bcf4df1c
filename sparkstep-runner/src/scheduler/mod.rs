//! Scheduler layer for the runner
//!
//! This layer watches a submitted job until it reaches a terminal state,
//! honouring caller cancellation along the way.

pub mod monitor;

pub use monitor::JobMonitor;
