//! Enum types used by the subrun configuration.

use serde::{Deserialize, Serialize};

/// Isolation level requested from the child CLI via `--sandbox`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    /// The child may read but not modify the workspace.
    ReadOnly,
    /// The child may write inside its working directory.
    WorkspaceWrite,
    /// No isolation.
    DangerFullAccess,
}

impl SandboxMode {
    /// The flag value passed on the child's command line.
    pub fn as_arg(self) -> &'static str {
        match self {
            SandboxMode::ReadOnly => "read-only",
            SandboxMode::WorkspaceWrite => "workspace-write",
            SandboxMode::DangerFullAccess => "danger-full-access",
        }
    }
}

/// What the supervisor reports when the child exits non-zero but still
/// produced a parseable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExitCodePolicy {
    /// Return the child's own exit code (default).
    #[default]
    Forward,
    /// Report success for any usable response, whatever the child's code.
    Normalize,
}

/// Platform default for the child CLI executable.
pub fn default_codex_cmd() -> String {
    if cfg!(windows) {
        "codex.cmd".to_string()
    } else {
        "codex".to_string()
    }
}
