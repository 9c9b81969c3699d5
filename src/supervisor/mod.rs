//! Subagent execution supervisor.
//!
//! One invocation runs one child CLI to completion:
//!
//! 1. the launcher spawns the child with piped standard streams;
//! 2. two drainer threads copy its output and diagnostic streams into
//!    queues while the prompt is written to its input;
//! 3. the watchdog consumes both queues until they end or the diagnostic
//!    stream has been silent for too long, killing the child in that case;
//! 4. the child's exit status is collected and the diagnostic capture is
//!    persisted next to the response;
//! 5. the classifier decides the outcome and, for failed outcomes, a
//!    fallback response is written in place of the child's.
//!
//! Timeout, missing output and invalid output are outcomes, not errors:
//! [`execute`] only returns `Err` when the child could not be started or
//! fed its prompt, or when the fallback response itself cannot be written.

mod classifier;
mod clock;
mod drainer;
mod fallback;
mod launcher;
mod watchdog;

pub use classifier::{ArtifactState, Outcome, classify, inspect_artifact};
pub use clock::{Clock, SystemClock};
pub use fallback::{FailureReport, fallback_document, write_fallback};
pub use launcher::{ChildHandle, Invocation, spawn};
pub use watchdog::{Terminate, WatchOutcome, Watchdog};

use crate::config::{Config, ExitCodePolicy};
use crate::error::{Result, SubrunError};
use crate::fs::{atomic_write, atomic_write_file};
use crate::info::{RunRecord, RunRecorder};
use crate::schema::ResponseContract;
use chrono::Utc;
use drainer::{StreamEvent, spawn_drainer};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Engine name recorded in run metadata.
pub const ENGINE: &str = "codex";

/// Timing and buffering knobs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub idle_timeout: Duration,
    pub poll_interval: Duration,
    pub chunk_size: usize,
    pub exit_code_policy: ExitCodePolicy,
}

impl SupervisorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            poll_interval: config.poll_interval(),
            chunk_size: config.chunk_size,
            exit_code_policy: config.exit_code_policy,
        }
    }
}

/// One prepared invocation.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub invocation: Invocation,
    /// Rendered prompt written to the child's input.
    pub prompt: String,
    /// Task identifier stamped into a fallback response.
    pub task_id: String,
    /// Where the diagnostic capture is persisted.
    pub stderr_path: PathBuf,
}

impl RunPlan {
    pub fn response_path(&self) -> &PathBuf {
        &self.invocation.output_path
    }
}

/// Everything known about a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: Outcome,
    /// The supervisor's exit code after applying the exit code policy.
    pub exit_code: i32,
    pub child_exit_code: i32,
    pub child_pid: u32,
    pub stdout: String,
    /// Diagnostic capture as persisted, including any timeout notice.
    pub stderr: String,
    pub duration: Duration,
    /// The synthesized response, when one replaced the child's.
    pub fallback: Option<Value>,
}

/// Run one invocation against the system clock.
pub fn execute(
    plan: &RunPlan,
    settings: &SupervisorSettings,
    contract: &dyn ResponseContract,
    recorder: &mut dyn RunRecorder,
) -> Result<RunReport> {
    execute_with_clock(plan, settings, contract, recorder, &SystemClock)
}

/// Run one invocation, judging idleness with `clock`.
pub fn execute_with_clock(
    plan: &RunPlan,
    settings: &SupervisorSettings,
    contract: &dyn ResponseContract,
    recorder: &mut dyn RunRecorder,
    clock: &dyn Clock,
) -> Result<RunReport> {
    let started = Instant::now();
    let mut record = RunRecord {
        engine: ENGINE.to_string(),
        model: plan.invocation.profile.clone(),
        started_at: Utc::now(),
        child_pid: None,
        working_directory: plan.invocation.working_dir.clone(),
        command_args: plan.invocation.command_line(),
    };

    if let Err(e) = recorder.started(&record) {
        tracing::warn!(error = %e, "failed to record run start");
    }

    atomic_write_file(&plan.stderr_path, "")?;

    let mut child = spawn(&plan.invocation)?;
    let child_pid = child.pid();
    record.child_pid = Some(child_pid);

    let (stdout_rx, stderr_rx, drainers) = match start_drainers(&mut child, settings.chunk_size) {
        Ok(started) => started,
        Err(e) => {
            let _ = child.kill_tree();
            let _ = child.wait();
            return Err(e);
        }
    };

    child.send_prompt(&plan.prompt, settings.idle_timeout)?;

    let watchdog = Watchdog::new(settings.idle_timeout, settings.poll_interval);
    let watched = watchdog.watch(&stdout_rx, &stderr_rx, clock, &mut child);

    let child_exit_code = child.wait()?;
    tracing::info!(pid = child_pid, exit_code = child_exit_code, timed_out = watched.timed_out, "subagent exited");

    if watched.timed_out {
        // A descendant outside the process group may still hold a pipe
        // open, so the drainers are left to finish on their own.
        drop(drainers);
    } else {
        for handle in drainers {
            if handle.join().is_err() {
                tracing::warn!(pid = child_pid, "stream drainer panicked");
            }
        }
    }

    let stdout = watched.stdout.to_text_lossy();
    let mut stderr_bytes = watched.stderr.to_bytes();
    if watched.timed_out {
        if !stderr_bytes.is_empty() && !stderr_bytes.ends_with(b"\n") {
            stderr_bytes.push(b'\n');
        }
        stderr_bytes.extend_from_slice(timeout_notice(settings.idle_timeout).as_bytes());
        stderr_bytes.push(b'\n');
    }
    if let Err(e) = atomic_write(&plan.stderr_path, &stderr_bytes) {
        tracing::warn!(error = %e, "failed to persist diagnostic capture");
    }
    let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

    let artifact = inspect_artifact(plan.response_path());
    let outcome = classify(watched.timed_out, artifact, child_exit_code);

    if child_exit_code != 0 && !stderr.trim().is_empty() {
        tracing::warn!(
            exit_code = child_exit_code,
            stderr = %stderr.trim_end(),
            "subagent exited with non-zero status"
        );
    }

    let fallback = match FailureReport::for_outcome(&outcome, plan.response_path(), settings.idle_timeout) {
        Some(report) => Some(write_fallback(
            plan.response_path(),
            &plan.task_id,
            &report,
            contract,
        )?),
        None => None,
    };

    let exit_code = outcome.exit_code(settings.exit_code_policy);
    tracing::info!(outcome = %outcome, exit_code, "run classified");

    if let Err(e) = recorder.finished(&record, exit_code) {
        tracing::warn!(error = %e, "failed to record run completion");
    }

    Ok(RunReport {
        outcome,
        exit_code,
        child_exit_code,
        child_pid,
        stdout,
        stderr,
        duration: started.elapsed(),
        fallback,
    })
}

/// Notice appended to the diagnostic capture of a timed-out run.
pub fn timeout_notice(idle_timeout: Duration) -> String {
    format!("Terminated after {}s of no output.", idle_timeout.as_secs())
}

type DrainerQueues = (
    mpsc::Receiver<StreamEvent>,
    mpsc::Receiver<StreamEvent>,
    Vec<std::thread::JoinHandle<()>>,
);

fn start_drainers(child: &mut ChildHandle, chunk_size: usize) -> Result<DrainerQueues> {
    let (stdout, stderr) = child.take_output_streams().ok_or_else(|| {
        SubrunError::LaunchFailure(format!(
            "subagent (pid {}) output streams unavailable",
            child.pid()
        ))
    })?;

    let (stdout_tx, stdout_rx) = mpsc::channel();
    let (stderr_tx, stderr_rx) = mpsc::channel();

    let spawn_error = |e| SubrunError::io("failed to start stream drainer", e);
    let stdout_handle = spawn_drainer("stdout", stdout, chunk_size, stdout_tx).map_err(spawn_error)?;
    let stderr_handle = spawn_drainer("stderr", stderr, chunk_size, stderr_tx).map_err(spawn_error)?;

    Ok((stdout_rx, stderr_rx, vec![stdout_handle, stderr_handle]))
}
