//! The task payload handed to a subagent.

use crate::error::{Result, SubrunError};
use crate::fs::read_text;
use serde_json::Value;
use std::path::Path;

/// A loaded `request.json`: task identifier, description and constraints,
/// passed to the child verbatim inside the rendered prompt.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    document: Value,
}

impl ExecutionRequest {
    /// Load and parse a request file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SubrunError::UserError(format!(
                "request file not found: {}",
                path.display()
            )));
        }

        let raw = read_text(path)?;
        Self::from_json(&raw).map_err(|e| {
            SubrunError::UserError(format!("request JSON is invalid: {}: {}", path.display(), e))
        })
    }

    /// Parse a request from JSON text.
    pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self {
            document: serde_json::from_str(raw)?,
        })
    }

    /// The task identifier, or an empty string when absent or not a string.
    pub fn task_id(&self) -> &str {
        self.document
            .get("task_id")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}
