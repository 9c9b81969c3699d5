//! Audit directory layout for subagent runs.
//!
//! Every delegated task gets a directory under the audit root:
//!
//! ```text
//! <audit_root>/<phase>/<task>/<subagent>/
//!   request.json    task handed to the child
//!   response.json   result written by the child (or the fallback writer)
//!   stderr.txt      verbatim diagnostic stream
//!   info.json       run metadata
//! ```
//!
//! Callers may bypass the layout by naming request and response files
//! directly; the sibling artifacts then live next to the response.

use crate::error::{Result, SubrunError};
use std::path::{Path, PathBuf};

/// File name of the request document inside a subagent directory.
pub const REQUEST_FILE: &str = "request.json";

/// File name of the response document inside a subagent directory.
pub const RESPONSE_FILE: &str = "response.json";

/// File name of the captured diagnostic stream.
pub const STDERR_FILE: &str = "stderr.txt";

/// File name of the run-metadata record.
pub const INFO_FILE: &str = "info.json";

/// How the caller identified the subagent's artifacts.
#[derive(Debug, Clone, Default)]
pub struct AuditSelector {
    pub audit_root: PathBuf,
    pub phase: Option<String>,
    pub task: Option<String>,
    pub subagent: Option<String>,
    pub request: Option<PathBuf>,
    pub response: Option<PathBuf>,
}

/// Resolved artifact paths for one subagent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPaths {
    pub request: PathBuf,
    pub response: PathBuf,
}

impl AuditPaths {
    /// Resolve artifact paths, creating the subagent directory when the
    /// phase/task/subagent form is used.
    pub fn resolve(selector: &AuditSelector) -> Result<Self> {
        if let (Some(request), Some(response)) = (&selector.request, &selector.response) {
            return Ok(Self {
                request: request.clone(),
                response: response.clone(),
            });
        }

        let (Some(phase), Some(task), Some(subagent)) =
            (&selector.phase, &selector.task, &selector.subagent)
        else {
            return Err(SubrunError::UserError(
                "either provide --request and --response, or provide --phase, --task and --subagent"
                    .to_string(),
            ));
        };

        let dir = selector.audit_root.join(phase).join(task).join(subagent);
        std::fs::create_dir_all(&dir).map_err(|e| {
            SubrunError::io(
                format!("failed to create subagent directory '{}'", dir.display()),
                e,
            )
        })?;

        Ok(Self {
            request: dir.join(REQUEST_FILE),
            response: dir.join(RESPONSE_FILE),
        })
    }

    /// Directory holding the response and its sibling artifacts.
    pub fn output_dir(&self) -> PathBuf {
        output_dir_for(&self.response)
    }

    pub fn stderr_path(&self) -> PathBuf {
        self.output_dir().join(STDERR_FILE)
    }

    pub fn info_path(&self) -> PathBuf {
        self.output_dir().join(INFO_FILE)
    }
}

/// Directory that holds a response file; `.` for a bare file name.
pub fn output_dir_for(response: &Path) -> PathBuf {
    match response.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
