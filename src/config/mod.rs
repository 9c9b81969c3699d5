//! Configuration for subrun.
//!
//! This module defines the Config struct that represents `.agent/subrun.yaml`.
//! A missing file means defaults; unknown keys are preserved; CLI flags
//! override file values at the call site.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::{Config, DEFAULT_CHUNK_SIZE, DEFAULT_IDLE_TIMEOUT_SECONDS, DEFAULT_POLL_INTERVAL_MS};
pub use types::{ExitCodePolicy, SandboxMode, default_codex_cmd};
