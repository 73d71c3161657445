//! Deterministic, pure logic shared by the loop stages.
//!
//! Core modules must be free of I/O side effects. They operate on text and
//! in-memory values and return deterministic outputs suitable for tests.

pub mod classifier;
pub mod deployments;
pub mod task;
pub mod types;
