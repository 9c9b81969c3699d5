//! Error types for the subrun CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Run outcomes such as a timeout or a missing response are not errors; they
//! are classified results (see `supervisor::Outcome`).

use crate::exit_codes;
use thiserror::Error;

/// Main error type for subrun operations.
#[derive(Error, Debug)]
pub enum SubrunError {
    /// User provided invalid arguments or inputs are unusable.
    #[error("{0}")]
    UserError(String),

    /// A request or response document failed validation.
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// The child process could not be started or fed its prompt.
    ///
    /// Distinct from a run-time timeout: no run was meaningfully started.
    #[error("Launch failed: {0}")]
    LaunchFailure(String),

    /// Filesystem or process I/O failed outside the child's own run.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl SubrunError {
    /// Build an `Io` error with a human-readable context line.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SubrunError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SubrunError::UserError(_) => exit_codes::USER_ERROR,
            SubrunError::ValidationError(_) => exit_codes::FAILURE,
            SubrunError::LaunchFailure(_) => exit_codes::LAUNCH_FAILURE,
            SubrunError::Io { .. } => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for subrun operations.
pub type Result<T> = std::result::Result<T, SubrunError>;
