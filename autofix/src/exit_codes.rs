//! Stable exit codes for autofix CLI commands.

/// Command succeeded. Every clean stop of `autofix run` exits with this code.
pub const OK: i32 = 0;
/// An error the loop cannot reason past (git, commit, or push failure).
pub const FATAL: i32 = 1;
/// Configuration was missing or invalid.
pub const INVALID: i32 = 2;
/// `autofix classify` saw a failure marker, or `autofix locate` found no match.
pub const FAILURE: i32 = 3;
/// `autofix classify` saw neither a failure nor a success marker.
pub const AMBIGUOUS: i32 = 4;
