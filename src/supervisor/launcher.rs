//! Child process launch.
//!
//! The child is spawned with all three standard streams piped. On Unix it
//! is placed in its own process group so a forced termination reaches any
//! descendants it started.

use super::watchdog::Terminate;
use crate::config::SandboxMode;
use crate::error::{Result, SubrunError};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Everything needed to build the child's argument vector.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub profile: Option<String>,
    pub sandbox: Option<SandboxMode>,
    pub working_dir: PathBuf,
    pub skip_git_repo_check: bool,
    /// Where the child must write its final response.
    pub output_path: PathBuf,
    pub extra_args: Vec<String>,
}

impl Invocation {
    /// Arguments after the program name.
    ///
    /// `exec [--profile P] [--sandbox S] [--cd DIR] [--skip-git-repo-check]
    /// --output-last-message PATH [extra...] -`; the trailing `-` makes the
    /// child read its prompt from standard input.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["exec".to_string()];

        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        if let Some(sandbox) = self.sandbox {
            args.push("--sandbox".to_string());
            args.push(sandbox.as_arg().to_string());
        }
        if !self.working_dir.as_os_str().is_empty() {
            args.push("--cd".to_string());
            args.push(self.working_dir.display().to_string());
        }
        if self.skip_git_repo_check {
            args.push("--skip-git-repo-check".to_string());
        }
        args.push("--output-last-message".to_string());
        args.push(self.output_path.display().to_string());
        args.extend(self.extra_args.iter().cloned());
        args.push("-".to_string());

        args
    }

    /// Program followed by its arguments, for logging and run metadata.
    pub fn command_line(&self) -> Vec<String> {
        let mut line = vec![self.program.clone()];
        line.extend(self.args());
        line
    }
}

/// A running child and the stream handles not yet handed out.
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    pid: u32,
    started_at: Instant,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

/// Spawn the child described by `invocation`.
pub fn spawn(invocation: &Invocation) -> Result<ChildHandle> {
    let mut command = Command::new(&invocation.program);
    command
        .args(invocation.args())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|e| {
        SubrunError::LaunchFailure(format!(
            "failed to execute '{}': {}\n\
             Fix: ensure the command is installed and in PATH, or set --codex-cmd.",
            invocation.program, e
        ))
    })?;

    let pid = child.id();
    tracing::info!(
        pid,
        command = ?invocation.command_line(),
        "subagent process started"
    );

    Ok(ChildHandle {
        stdin: child.stdin.take(),
        stdout: child.stdout.take(),
        stderr: child.stderr.take(),
        child,
        pid,
        started_at: Instant::now(),
    })
}

impl ChildHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Hand the output and diagnostic streams to their drainers.
    pub fn take_output_streams(&mut self) -> Option<(ChildStdout, ChildStderr)> {
        match (self.stdout.take(), self.stderr.take()) {
            (Some(stdout), Some(stderr)) => Some((stdout, stderr)),
            _ => None,
        }
    }

    /// Write the whole prompt to the child's input, then close it.
    ///
    /// The write runs on its own thread and must finish within `deadline`.
    /// On failure or deadline the child is killed and a `LaunchFailure`
    /// returned; a child that cannot receive its task never counts as a run.
    pub fn send_prompt(&mut self, prompt: &str, deadline: Duration) -> Result<()> {
        let Some(stdin) = self.stdin.take() else {
            return Err(self.abort_launch(format!(
                "failed to write prompt to subagent (pid {}): child input stream unavailable",
                self.pid
            )));
        };

        let (tx, rx) = mpsc::channel();
        let payload = prompt.as_bytes().to_vec();
        let writer = thread::Builder::new()
            .name("prompt-writer".to_string())
            .spawn(move || {
                let _ = tx.send(write_prompt(stdin, &payload));
            });
        if let Err(e) = writer {
            return Err(self.abort_launch(format!(
                "failed to start prompt writer for subagent (pid {}): {}",
                self.pid, e
            )));
        }

        match rx.recv_timeout(deadline) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(self.abort_launch(format!(
                "failed to write prompt to subagent (pid {}): {}",
                self.pid, e
            ))),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                Err(self.abort_launch(format!(
                    "subagent (pid {}) did not accept its prompt within {}s",
                    self.pid,
                    deadline.as_secs()
                )))
            }
        }
    }

    /// Kill and reap the child, returning the launch failure to report.
    fn abort_launch(&mut self, message: String) -> SubrunError {
        if let Err(e) = self.kill_tree() {
            tracing::warn!(pid = self.pid, error = %e, "failed to kill child after prompt failure");
        }
        let _ = self.child.wait();
        SubrunError::LaunchFailure(message)
    }

    /// Wait for the child to exit and return its exit code.
    pub fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().map_err(|e| {
            SubrunError::io(format!("failed to wait for subagent (pid {})", self.pid), e)
        })?;
        Ok(exit_code_of(status))
    }

    /// Kill the child and everything in its process group.
    pub fn kill_tree(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            match killpg(Pid::from_raw(self.pid as i32), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => {
                    tracing::debug!(pid = self.pid, error = %e, "killpg failed, killing child only");
                }
            }
        }

        match self.child.kill() {
            Ok(()) => Ok(()),
            // Already exited.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Terminate for ChildHandle {
    fn terminate(&mut self) -> io::Result<()> {
        tracing::info!(pid = self.pid, elapsed_secs = self.elapsed().as_secs(), "terminating subagent");
        self.kill_tree()
    }
}

/// Write and flush the prompt; dropping `stdin` closes the child's input.
fn write_prompt(mut stdin: ChildStdin, prompt: &[u8]) -> io::Result<()> {
    stdin.write_all(prompt)?;
    stdin.flush()
}

/// The child's exit code; on Unix a signal death reports `-signal`.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}
