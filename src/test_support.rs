use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Script preamble: pick the response path out of the arguments and
/// consume the prompt, leaving `$out` and `$prompt_file` for the body.
const PREAMBLE: &str = r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--output-last-message" ]; then
    out="$2"
    shift
  fi
  shift
done
prompt_file="$(dirname "$0")/prompt.txt"
cat > "$prompt_file"
"#;

/// A scratch directory holding a stand-in for the subagent CLI.
pub(crate) struct FakeCodex {
    pub(crate) dir: TempDir,
    pub(crate) program: PathBuf,
}

impl FakeCodex {
    /// Write an executable script whose body runs after the preamble.
    pub(crate) fn new(body: &str) -> Self {
        Self::raw(&format!("{}{}\n", PREAMBLE, body))
    }

    /// Write `script` as-is, without the preamble; its input is left unread.
    pub(crate) fn raw(script: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let program = dir.path().join("fake-codex");
        std::fs::write(&program, script).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        Self { dir, program }
    }

    pub(crate) fn program(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// The prompt the script received on standard input.
    pub(crate) fn received_prompt(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("prompt.txt")).unwrap_or_default()
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Whether `pid` has exited, waiting up to `within` for it to go.
///
/// A zombie counts as gone: it no longer runs, it is only waiting for a
/// parent that may never reap it.
#[cfg(unix)]
pub(crate) fn process_gone(pid: u32, within: Duration) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let deadline = Instant::now() + within;
    loop {
        let gone = match kill(Pid::from_raw(pid as i32), None) {
            Err(Errno::ESRCH) => true,
            _ => is_zombie(pid),
        };
        if gone {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[cfg(unix)]
fn is_zombie(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| {
            // The state follows the parenthesised command name.
            let rest = &stat[stat.rfind(')')? + 1..];
            rest.split_whitespace().next().map(|state| state == "Z")
        })
        .unwrap_or(false)
}
