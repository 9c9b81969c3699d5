//! Terminal classification of a finished run.

use crate::config::ExitCodePolicy;
use crate::exit_codes;
use crate::fs::read_text;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// What the response artifact looked like after the child exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Missing,
    Unparseable,
    Parsed,
}

/// Inspect the response artifact at `path`.
///
/// A file that exists but cannot be read as text counts as unparseable.
pub fn inspect_artifact(path: &Path) -> ArtifactState {
    if !path.is_file() {
        return ArtifactState::Missing;
    }

    match read_text(path) {
        Ok(raw) if serde_json::from_str::<Value>(&raw).is_ok() => ArtifactState::Parsed,
        _ => ArtifactState::Unparseable,
    }
}

/// The single terminal outcome of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Usable response, child exited 0.
    Success { exit_code: i32 },
    /// Usable response, child exited non-zero. Not a failure.
    NonZeroExit { exit_code: i32 },
    /// Killed for diagnostic-stream inactivity.
    Timeout,
    /// Child exited without writing a response.
    MissingOutput { exit_code: i32 },
    /// Child wrote a response that does not parse.
    InvalidOutput { exit_code: i32 },
}

/// Assign the outcome. Checked in order: timeout, missing artifact,
/// unparseable artifact, then the child's own exit code.
pub fn classify(timed_out: bool, artifact: ArtifactState, exit_code: i32) -> Outcome {
    if timed_out {
        return Outcome::Timeout;
    }

    match artifact {
        ArtifactState::Missing => Outcome::MissingOutput { exit_code },
        ArtifactState::Unparseable => Outcome::InvalidOutput { exit_code },
        ArtifactState::Parsed if exit_code == 0 => Outcome::Success { exit_code },
        ArtifactState::Parsed => Outcome::NonZeroExit { exit_code },
    }
}

impl Outcome {
    /// Whether a fallback response has to be synthesized.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::Timeout | Outcome::MissingOutput { .. } | Outcome::InvalidOutput { .. }
        )
    }

    /// The supervisor's exit code for this outcome.
    pub fn exit_code(&self, policy: ExitCodePolicy) -> i32 {
        match (self, policy) {
            (Outcome::Success { .. }, _) => exit_codes::SUCCESS,
            (Outcome::NonZeroExit { exit_code }, ExitCodePolicy::Forward) => *exit_code,
            (Outcome::NonZeroExit { .. }, ExitCodePolicy::Normalize) => exit_codes::SUCCESS,
            _ => exit_codes::FAILURE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::NonZeroExit { .. } => "non_zero_exit",
            Outcome::Timeout => "timeout",
            Outcome::MissingOutput { .. } => "missing_output",
            Outcome::InvalidOutput { .. } => "invalid_output",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Timeout => write!(f, "timeout"),
            Outcome::Success { exit_code }
            | Outcome::NonZeroExit { exit_code }
            | Outcome::MissingOutput { exit_code }
            | Outcome::InvalidOutput { exit_code } => {
                write!(f, "{} (exit code {})", self.label(), exit_code)
            }
        }
    }
}
