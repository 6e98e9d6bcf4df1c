//! Service layer
//!
//! Business logic of the step. The submitter turns a job spec into exactly
//! one remote job, reusing a job created by an earlier attempt when there is
//! one.

mod submitter;

pub use submitter::Submitter;
