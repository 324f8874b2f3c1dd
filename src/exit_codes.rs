//! Process exit codes.

/// Everything went as requested.
pub const SUCCESS: i32 = 0;

/// A command failed or a precondition was not met.
pub const GENERAL_ERROR: i32 = 1;

/// The user interrupted with Ctrl+C (128 + SIGINT).
pub const USER_INTERRUPTED: i32 = 130;
