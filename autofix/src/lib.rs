//! Vercel build-failure remediation loop.
//!
//! Repeatedly locates the Vercel deployment built from the repository HEAD,
//! classifies its build logs, hands failing logs to a coding agent, and
//! commits and pushes whatever the agent changed. The architecture keeps a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (log classification, deployment
//!   table parsing, task rendering). No I/O.
//! - **[`io`]**: Side-effecting operations (configuration, git, the Vercel
//!   CLI, the fixer process), each behind a trait so stages can be scripted in
//!   tests.
//!
//! Orchestration modules ([`locate`], [`fix`], [`publish`], [`looping`])
//! coordinate core logic with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod fix;
pub mod io;
pub mod locate;
pub mod logging;
pub mod looping;
pub mod publish;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
