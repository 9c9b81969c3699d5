//! Prompt rendering for subagent runs.
//!
//! The child receives a single prompt on standard input: the shared base
//! prompt followed by the request document in a fenced JSON block.
//!
//! ```text
//! <base prompt>
//!
//! Request JSON:
//! ```json
//! { ... }
//! ```
//! ```

use crate::error::{Result, SubrunError};
use crate::fs::read_text;
use crate::request::ExecutionRequest;
use std::fmt::Write;
use std::io;
use std::path::Path;

/// Load the base prompt, trimmed of surrounding whitespace.
pub fn load_prompt<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SubrunError::UserError(format!(
            "prompt file not found: {}\n\
             Fix: pass --prompt-file or set prompt_file in the config.",
            path.display()
        )));
    }

    Ok(read_text(path)?.trim().to_string())
}

/// Combine the base prompt with the request document.
pub fn build_prompt(base_prompt: &str, request: &ExecutionRequest) -> Result<String> {
    let request_json = serde_json::to_string_pretty(request.document()).map_err(|e| {
        SubrunError::io("failed to serialize request JSON", io::Error::other(e))
    })?;

    Ok(format!(
        "{}\n\nRequest JSON:\n```json\n{}\n```",
        base_prompt,
        escape_non_ascii(&request_json)
    ))
}

/// Escape every non-ASCII character as a JSON `\uXXXX` sequence.
///
/// Only valid on serialized JSON, where such characters can appear solely
/// inside string literals.
fn escape_non_ascii(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
            continue;
        }
        let mut units = [0u16; 2];
        for unit in ch.encode_utf16(&mut units) {
            let _ = write!(out, "\\u{:04x}", unit);
        }
    }
    out
}
