//! I/O adapters for the loop stages.
//!
//! Every external tool sits behind a trait here so orchestration can be driven
//! by scripted fakes in tests.

pub mod config;
pub mod fixer;
pub mod git;
pub mod process;
pub mod vercel;
