//! Exit code constants for the subrun CLI.
//!
//! - 0: Success (or the child's own code when forwarded)
//! - 1: Run failed (timeout, missing or invalid response) or validation failed
//! - 2: User error (bad args, missing request or prompt)
//! - 3: Launch failure (child could not be started or fed its prompt)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Run classified as failed, or a document failed validation.
pub const FAILURE: i32 = 1;

/// User error: bad arguments, unreadable inputs, invalid configuration.
pub const USER_ERROR: i32 = 2;

/// The child process could not be spawned or its input could not be written.
pub const LAUNCH_FAILURE: i32 = 3;

/// Clamp an arbitrary exit code into the range a process can report.
///
/// Codes outside `0..=255` (including negative signal codes) become `FAILURE`.
pub fn to_process_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(FAILURE as u8)
}
