//! Synthesized failure responses.
//!
//! When the child leaves no usable response, one is written in its place so
//! the caller always finds a document that satisfies the response contract.

use super::classifier::Outcome;
use crate::error::Result;
use crate::fs::write_json_pretty;
use crate::schema::{DEFAULT_VERSION, ResponseContract, builtin_response_template, response_defaults};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Summary and issue tags for a failed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub summary: String,
    pub issues: Vec<String>,
}

impl FailureReport {
    /// Describe a failed outcome; `None` for outcomes that kept the child's
    /// own response.
    pub fn for_outcome(outcome: &Outcome, artifact: &Path, idle_timeout: Duration) -> Option<Self> {
        let artifact_name = artifact
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| artifact.display().to_string());
        let idle_secs = idle_timeout.as_secs();

        let report = match outcome {
            Outcome::Timeout => Self {
                summary: format!("Subagent timed out after {}s of no stderr output", idle_secs),
                issues: vec![
                    "timeout".to_string(),
                    format!("no stderr output for {}s", idle_secs),
                ],
            },
            Outcome::MissingOutput { exit_code } => Self {
                summary: format!("Subagent did not produce {}", artifact_name),
                issues: vec![
                    format!("missing {}", artifact_name),
                    format!("exit code: {}", exit_code),
                ],
            },
            Outcome::InvalidOutput { exit_code } => Self {
                summary: "Subagent returned invalid JSON".to_string(),
                issues: vec![
                    "invalid json response".to_string(),
                    format!("exit code: {}", exit_code),
                ],
            },
            Outcome::Success { .. } | Outcome::NonZeroExit { .. } => return None,
        };

        Some(report)
    }
}

/// Build the fallback document.
///
/// Starts from the built-in response shape, layers the contract's defaults
/// on top when they load, then forces the failure fields. An unavailable
/// template degrades to the built-in shape rather than failing.
pub fn fallback_document(
    task_id: &str,
    report: &FailureReport,
    contract: &dyn ResponseContract,
) -> Value {
    let mut fields = response_defaults(&builtin_response_template());
    let mut version = DEFAULT_VERSION.to_string();

    match contract.defaults() {
        Ok(defaults) => {
            fields.extend(defaults.fields);
            version = defaults.version;
        }
        Err(e) => {
            tracing::warn!(error = %e, "response template unavailable, using built-in shape");
        }
    }

    fields.insert("version".to_string(), Value::String(version));
    fields.insert("task_id".to_string(), Value::String(task_id.to_string()));
    fields.insert("status".to_string(), Value::String("failed".to_string()));
    fields.insert("summary".to_string(), Value::String(report.summary.clone()));
    fields.insert("outputs".to_string(), Value::Array(Vec::new()));
    fields.insert(
        "issues".to_string(),
        Value::Array(report.issues.iter().cloned().map(Value::String).collect()),
    );

    Value::Object(fields)
}

/// Write the fallback document to `path`, replacing whatever is there.
pub fn write_fallback(
    path: &Path,
    task_id: &str,
    report: &FailureReport,
    contract: &dyn ResponseContract,
) -> Result<Value> {
    let document = fallback_document(task_id, report, contract);

    write_json_pretty(path, &document)?;

    tracing::info!(
        path = %path.display(),
        summary = %report.summary,
        "wrote fallback response"
    );

    Ok(document)
}
