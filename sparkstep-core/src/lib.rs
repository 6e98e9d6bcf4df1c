//! Sparkstep Core
//!
//! Core types and abstractions for submitting and monitoring jobs on a
//! managed Spark-on-YARN service.
//!
//! This crate contains:
//! - Domain types: the remote job document, job kinds, job specs, handles and outcomes
//! - DTOs: request/response bodies exchanged with the remote job API

pub mod domain;
pub mod dto;
pub mod error;

pub use error::SpecError;
