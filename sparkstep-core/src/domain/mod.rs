//! Core domain types
//!
//! Types shared between the runner (submits and monitors) and the operator
//! CLI (inspects and cancels). They model the remote job document and the
//! local view of a submission.

pub mod job;
pub mod key;
pub mod kind;
pub mod outcome;
pub mod spec;
