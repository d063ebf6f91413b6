//! Role activity audit.
//!
//! `aggregator` holds the counting and ranking logic; `runner` drives a
//! platform through the full audit sequence.

pub mod aggregator;
pub mod runner;

pub use aggregator::*;
pub use runner::{run_audit, AuditSettings};
