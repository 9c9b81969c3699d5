//! Request/response templates: the single source of truth for document shape.
//!
//! Templates live in `.agent/templates/` as `template_request.json` and
//! `template_response.json`. When no template directory exists anywhere
//! near the working directory the built-in shapes below are used instead.

use crate::error::{Result, SubrunError};
use crate::fs::read_text;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

/// Template directory, relative to a project root.
pub const TEMPLATES_SUBDIR: &str = ".agent/templates";

pub const REQUEST_TEMPLATE_FILE: &str = "template_request.json";
pub const RESPONSE_TEMPLATE_FILE: &str = "template_response.json";
pub const INFO_TEMPLATE_FILE: &str = "template_info.json";

/// How many directories upward discovery looks for `.agent/templates/`.
pub const MAX_SEARCH_DEPTH: usize = 5;

/// Document version used when a template does not carry one.
pub const DEFAULT_VERSION: &str = "1.0";

/// Fields every response template (and response) must define.
pub const RESPONSE_REQUIRED_FIELDS: [&str; 6] =
    ["version", "task_id", "status", "summary", "outputs", "issues"];

/// Fields the request template is expected to define.
pub const REQUEST_EXPECTED_FIELDS: [&str; 6] = [
    "version",
    "task_id",
    "task",
    "context",
    "constraints",
    "acceptance_criteria",
];

/// Allowed values of a response's `status`.
pub const VALID_STATUSES: [&str; 3] = ["success", "partial", "failed"];

/// Where templates come from.
#[derive(Debug, Clone, Default)]
pub struct TemplateSource {
    dir: Option<PathBuf>,
}

impl TemplateSource {
    /// Use only the built-in templates.
    pub fn builtin() -> Self {
        Self { dir: None }
    }

    /// Read templates from a specific directory.
    pub fn from_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Use the configured directory if given, otherwise search upward from
    /// `start`. Falls back to the built-in templates when nothing is found.
    pub fn discover(configured: Option<&Path>, start: &Path) -> Self {
        match configured {
            Some(dir) => Self::from_dir(dir),
            None => match find_template_dir(start) {
                Some(dir) => {
                    tracing::debug!(dir = %dir.display(), "using discovered template directory");
                    Self::from_dir(dir)
                }
                None => {
                    tracing::debug!("no template directory found, using built-in templates");
                    Self::builtin()
                }
            },
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Load the request template.
    pub fn request_template(&self) -> Result<Map<String, Value>> {
        match &self.dir {
            Some(dir) => load_template(&dir.join(REQUEST_TEMPLATE_FILE), "request"),
            None => Ok(builtin_request_template()),
        }
    }

    /// Load the response template.
    pub fn response_template(&self) -> Result<Map<String, Value>> {
        match &self.dir {
            Some(dir) => load_template(&dir.join(RESPONSE_TEMPLATE_FILE), "response"),
            None => Ok(builtin_response_template()),
        }
    }

    /// Version for run-metadata records: taken from `template_info.json`
    /// when present and readable, otherwise the default.
    pub fn info_version(&self) -> String {
        self.dir
            .as_ref()
            .map(|dir| dir.join(INFO_TEMPLATE_FILE))
            .filter(|path| path.exists())
            .and_then(|path| load_template(&path, "info").ok())
            .and_then(|template| template.get("version").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| DEFAULT_VERSION.to_string())
    }
}

/// Search `start` and up to `MAX_SEARCH_DEPTH - 1` ancestors for `.agent/templates/`.
pub fn find_template_dir(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());

    start
        .ancestors()
        .take(MAX_SEARCH_DEPTH)
        .map(|dir| dir.join(TEMPLATES_SUBDIR))
        .find(|candidate| candidate.is_dir())
}

fn load_template(path: &Path, kind: &str) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Err(SubrunError::UserError(format!(
            "{} template not found: {}",
            kind,
            path.display()
        )));
    }

    let raw = read_text(path)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SubrunError::UserError(format!(
            "{} template is not a JSON object: {}",
            kind,
            path.display()
        ))),
        Err(e) => Err(SubrunError::UserError(format!(
            "{} template is invalid JSON: {}: {}",
            kind,
            path.display(),
            e
        ))),
    }
}

/// Built-in request shape.
pub fn builtin_request_template() -> Map<String, Value> {
    let value = json!({
        "version": DEFAULT_VERSION,
        "task_id": "",
        "task": "",
        "context": { "files": [], "notes": "" },
        "constraints": [],
        "acceptance_criteria": []
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Built-in response shape.
pub fn builtin_response_template() -> Map<String, Value> {
    let value = json!({
        "version": DEFAULT_VERSION,
        "task_id": "",
        "status": "",
        "summary": "",
        "outputs": [],
        "issues": []
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Default field values derived from a template: scalars as written,
/// arrays emptied, objects emptied.
pub fn response_defaults(template: &Map<String, Value>) -> Map<String, Value> {
    template
        .iter()
        .map(|(key, value)| {
            let default = match value {
                Value::Array(_) => Value::Array(Vec::new()),
                Value::Object(_) => Value::Object(Map::new()),
                scalar => scalar.clone(),
            };
            (key.clone(), default)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_templates(root: &Path, request: &str, response: &str) -> PathBuf {
        let dir = root.join(TEMPLATES_SUBDIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(REQUEST_TEMPLATE_FILE), request).unwrap();
        std::fs::write(dir.join(RESPONSE_TEMPLATE_FILE), response).unwrap();
        dir
    }

    #[test]
    fn builtin_templates_have_required_fields() {
        let request = builtin_request_template();
        for field in REQUEST_EXPECTED_FIELDS {
            assert!(request.contains_key(field), "request missing {}", field);
        }
        let response = builtin_response_template();
        for field in RESPONSE_REQUIRED_FIELDS {
            assert!(response.contains_key(field), "response missing {}", field);
        }
    }

    #[test]
    fn find_template_dir_searches_ancestors() {
        let temp_dir = TempDir::new().unwrap();
        let dir = write_templates(temp_dir.path(), "{}", "{}");
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_template_dir(&nested).unwrap();
        assert_eq!(found, dir.canonicalize().unwrap());
    }

    #[test]
    fn find_template_dir_stops_after_max_depth() {
        let temp_dir = TempDir::new().unwrap();
        write_templates(temp_dir.path(), "{}", "{}");
        let deep = temp_dir.path().join("1/2/3/4/5");
        std::fs::create_dir_all(&deep).unwrap();

        assert!(find_template_dir(&deep).is_none());
    }

    #[test]
    fn discover_without_templates_is_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let source = TemplateSource::discover(None, temp_dir.path());
        assert!(source.dir().is_none());
        assert_eq!(source.response_template().unwrap(), builtin_response_template());
    }

    #[test]
    fn missing_template_file_in_dir_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = TemplateSource::from_dir(temp_dir.path());

        let err = source.response_template().unwrap_err();
        assert!(err.to_string().contains("response template not found"));
    }

    #[test]
    fn invalid_template_json_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let dir = write_templates(temp_dir.path(), "[1, 2]", "{broken");
        let source = TemplateSource::from_dir(&dir);

        assert!(
            source
                .request_template()
                .unwrap_err()
                .to_string()
                .contains("not a JSON object")
        );
        assert!(
            source
                .response_template()
                .unwrap_err()
                .to_string()
                .contains("invalid JSON")
        );
    }

    #[test]
    fn response_defaults_empty_containers() {
        let template = match json!({
            "version": "2.0",
            "status": "success",
            "outputs": [{"path": "x"}],
            "meta": {"a": 1},
            "score": 3
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let defaults = response_defaults(&template);
        assert_eq!(defaults["version"], "2.0");
        assert_eq!(defaults["status"], "success");
        assert_eq!(defaults["outputs"], json!([]));
        assert_eq!(defaults["meta"], json!({}));
        assert_eq!(defaults["score"], 3);
    }

    #[test]
    fn info_version_reads_info_template() {
        let temp_dir = TempDir::new().unwrap();
        let dir = write_templates(temp_dir.path(), "{}", "{}");
        let source = TemplateSource::from_dir(&dir);
        assert_eq!(source.info_version(), DEFAULT_VERSION);

        std::fs::write(dir.join(INFO_TEMPLATE_FILE), r#"{"version": "1.3"}"#).unwrap();
        assert_eq!(source.info_version(), "1.3");
    }
}
