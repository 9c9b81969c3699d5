//! Filesystem utilities for subrun.
//!
//! Atomic writes for artifacts the supervisor may overwrite, and text reads
//! that tolerate the UTF-8 byte-order mark many editors prepend to JSON and
//! markdown files.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file};

use crate::error::{Result, SubrunError};
use serde::Serialize;
use std::io;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Strip a leading UTF-8 byte-order mark, if present.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix(UTF8_BOM).unwrap_or(text)
}

/// Read a file as UTF-8 text with any leading BOM removed.
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| SubrunError::io(format!("failed to read '{}'", path.display()), e))?;
    Ok(strip_bom(&raw).to_string())
}

/// Serialize `value` as pretty JSON and write it atomically to `path`.
pub fn write_json_pretty<P: AsRef<Path>, T: Serialize + ?Sized>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        SubrunError::io(
            format!("failed to serialize '{}'", path.display()),
            io::Error::other(e),
        )
    })?;
    atomic_write_file(path, &json)
}
