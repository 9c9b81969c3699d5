//! The `Config` struct backing `.agent/subrun.yaml`.

use super::types::{ExitCodePolicy, SandboxMode, default_codex_cmd};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default idle timeout: seconds of diagnostic-stream silence before the
/// child is presumed hung.
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 60;

/// Default bounded wait on the output queue per watchdog iteration.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default read size for each stream drainer.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Configuration for subagent runs.
///
/// Every field is optional in the YAML; unknown keys are kept in `extra`
/// so files written by newer versions survive a load/save round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Child invocation
    // =========================================================================
    /// Executable for the subagent CLI.
    pub codex_cmd: String,

    /// Config profile selector passed as `--profile`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Sandbox mode passed as `--sandbox`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxMode>,

    /// Working directory passed as `--cd`.
    pub working_dir: PathBuf,

    /// Pass `--skip-git-repo-check` to the child.
    pub skip_git_repo_check: bool,

    /// Extra child arguments as a single shell-quoted string.
    pub extra_args: String,

    // =========================================================================
    // Watchdog
    // =========================================================================
    /// Seconds of diagnostic-stream silence tolerated before termination.
    pub idle_timeout_seconds: u64,

    /// Bounded wait on the output queue, in milliseconds.
    pub poll_interval_ms: u64,

    /// Bytes read per chunk by each stream drainer.
    pub chunk_size: usize,

    /// Exit code reported for a usable response from a non-zero child.
    pub exit_code_policy: ExitCodePolicy,

    // =========================================================================
    // Layout
    // =========================================================================
    /// Base prompt prepended to every request.
    pub prompt_file: PathBuf,

    /// Root of the `<phase>/<task>/<subagent>/` audit tree.
    pub audit_root: PathBuf,

    /// Directory holding `template_request.json` and `template_response.json`.
    /// Discovered from the working directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            codex_cmd: default_codex_cmd(),
            profile: None,
            sandbox: None,
            working_dir: PathBuf::from("."),
            skip_git_repo_check: false,
            extra_args: String::new(),
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECONDS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            exit_code_policy: ExitCodePolicy::default(),
            prompt_file: PathBuf::from(".agent/docs/subagent_prompt.md"),
            audit_root: PathBuf::from(".agent/audit"),
            templates_dir: None,
            extra: BTreeMap::new(),
        }
    }
}
