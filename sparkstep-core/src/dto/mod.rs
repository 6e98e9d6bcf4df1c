//! Data Transfer Objects (DTOs)
//!
//! Request and response bodies exchanged with the remote job API.
//! Separate from domain types to keep wire concerns isolated.

pub mod job;
