//! Repository layer
//!
//! The remote job API as seen by the step: create, status, cancel and
//! lookup by idempotency key. Trait-based so the submitter and monitor can
//! run against an in-memory fake in tests.

mod jobs;

pub use jobs::{HttpJobRepository, JobRepository};
