//! Run metadata (`info.json`).
//!
//! The supervisor reports to a [`RunRecorder`] twice per invocation: once
//! before the child is spawned, so even a supervisor crash leaves a record
//! that a run was attempted, and once after classification with the final
//! exit code.
//!
//! # Record Format
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "execution_info": { "engine", "model", "started_at", "completed_at", "duration_seconds" },
//!   "process_info": { "pid", "child_pid", "exit_code" },
//!   "command_info": { "working_directory", "command_args" },
//!   "performance_metrics": { "total_tokens", "prompt_tokens", "completion_tokens", "api_calls_count" },
//!   "metadata": { "hostname", "platform", "tool_version" }
//! }
//! ```

use crate::error::Result;
use crate::fs::write_json_pretty;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the supervisor knows about a run at a given moment.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub engine: String,
    pub model: Option<String>,
    pub started_at: DateTime<Utc>,
    pub child_pid: Option<u32>,
    pub working_directory: PathBuf,
    pub command_args: Vec<String>,
}

/// Side-effecting sink for run metadata.
pub trait RunRecorder {
    /// Called before the child is spawned.
    fn started(&mut self, record: &RunRecord) -> Result<()>;

    /// Called once the run has been classified.
    fn finished(&mut self, record: &RunRecord, exit_code: i32) -> Result<()>;
}

/// Serialized form of `info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub version: String,
    pub execution_info: ExecutionInfo,
    pub process_info: ProcessInfo,
    pub command_info: CommandInfo,
    pub performance_metrics: PerformanceMetrics,
    pub metadata: HostMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub engine: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// The supervisor's own process id.
    pub pid: u32,
    pub child_pid: Option<u32>,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandInfo {
    pub working_directory: String,
    pub command_args: Vec<String>,
}

/// Token accounting. The subprocess engine cannot observe tokens, so the
/// counts stay null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_tokens: Option<u64>,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub api_calls_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostMetadata {
    pub hostname: String,
    pub platform: String,
    pub tool_version: String,
}

impl RunInfo {
    /// Build the record; `exit_code` is `None` while the run is in flight.
    pub fn build(version: &str, record: &RunRecord, exit_code: Option<i32>) -> Self {
        let completed_at = exit_code.map(|_| Utc::now());
        let duration_seconds = completed_at.map(|end| {
            (end - record.started_at)
                .to_std()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0)
        });

        Self {
            version: version.to_string(),
            execution_info: ExecutionInfo {
                engine: record.engine.clone(),
                model: record.model.clone().unwrap_or_default(),
                started_at: record.started_at,
                completed_at,
                duration_seconds,
            },
            process_info: ProcessInfo {
                pid: std::process::id(),
                child_pid: record.child_pid,
                exit_code,
            },
            command_info: CommandInfo {
                working_directory: record.working_directory.display().to_string(),
                command_args: record.command_args.clone(),
            },
            performance_metrics: PerformanceMetrics::default(),
            metadata: HostMetadata::current(),
        }
    }
}

impl HostMetadata {
    fn current() -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            hostname,
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Writes `info.json` into the run's output directory.
#[derive(Debug, Clone)]
pub struct InfoFile {
    path: PathBuf,
    version: String,
}

impl InfoFile {
    pub fn new(path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn write(&self, info: &RunInfo) -> Result<()> {
        write_json_pretty(&self.path, info)
    }
}

impl RunRecorder for InfoFile {
    fn started(&mut self, record: &RunRecord) -> Result<()> {
        self.write(&RunInfo::build(&self.version, record, None))
    }

    fn finished(&mut self, record: &RunRecord, exit_code: i32) -> Result<()> {
        self.write(&RunInfo::build(&self.version, record, Some(exit_code)))
    }
}
