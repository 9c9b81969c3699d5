//! Request and response validation against the templates.

use super::templates::{
    REQUEST_EXPECTED_FIELDS, RESPONSE_REQUIRED_FIELDS, TemplateSource, VALID_STATUSES,
};
use crate::fs::read_text;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// Prefix marking an error as advisory rather than fatal.
pub const WARNING_PREFIX: &str = "Warning:";

/// Outcome of validating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors that are not prefixed with `Warning:`.
    pub fn fatal_errors(&self) -> Vec<&str> {
        self.errors
            .iter()
            .map(String::as_str)
            .filter(|e| !e.starts_with(WARNING_PREFIX))
            .collect()
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            warnings: Vec::new(),
        }
    }
}

/// A validated file: the report plus the parsed document when it parsed.
#[derive(Debug, Clone)]
pub struct FileValidation {
    pub report: ValidationReport,
    pub document: Option<Value>,
}

/// Validate a request document against the request template.
pub fn validate_request(document: &Value, templates: &TemplateSource) -> ValidationReport {
    let Some(fields) = document.as_object() else {
        return ValidationReport::error("Request JSON must be an object");
    };

    let mut report = ValidationReport::default();
    match templates.request_template() {
        Ok(template) => compare_fields("Request", &template, fields, &mut report),
        Err(e) => report
            .errors
            .push(format!("Could not load template for validation: {}", e)),
    }
    report
}

/// Validate a response document against the response template.
///
/// With `check_fields` false only the JSON shape (an object) is checked.
pub fn validate_response(
    document: &Value,
    templates: &TemplateSource,
    check_fields: bool,
) -> ValidationReport {
    let Some(fields) = document.as_object() else {
        return ValidationReport::error("Response JSON must be an object");
    };

    let mut report = ValidationReport::default();
    if !check_fields {
        return report;
    }

    match templates.response_template() {
        Ok(template) => {
            compare_fields("Response", &template, fields, &mut report);
            if let Some(status) = fields.get("status") {
                let valid = status
                    .as_str()
                    .is_some_and(|s| VALID_STATUSES.contains(&s));
                if !valid {
                    report.errors.push(format!(
                        "Invalid status: {}. Must be one of {}",
                        status,
                        VALID_STATUSES.join(", ")
                    ));
                }
            }
        }
        Err(e) => report
            .errors
            .push(format!("Could not load template for validation: {}", e)),
    }
    report
}

/// Read and validate a request file.
pub fn validate_request_file(path: &Path, templates: &TemplateSource) -> FileValidation {
    validate_file(path, "Request", |doc| validate_request(doc, templates))
}

/// Read and validate a response file.
pub fn validate_response_file(
    path: &Path,
    templates: &TemplateSource,
    check_fields: bool,
) -> FileValidation {
    validate_file(path, "Response", |doc| {
        validate_response(doc, templates, check_fields)
    })
}

fn validate_file(
    path: &Path,
    kind: &str,
    validate: impl FnOnce(&Value) -> ValidationReport,
) -> FileValidation {
    if !path.exists() {
        return FileValidation {
            report: ValidationReport::error(format!("{} file not found: {}", kind, path.display())),
            document: None,
        };
    }

    let parsed = read_text(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str::<Value>(&raw).map_err(|e| e.to_string()));

    match parsed {
        Ok(document) => FileValidation {
            report: validate(&document),
            document: Some(document),
        },
        Err(e) => FileValidation {
            report: ValidationReport::error(format!("{} JSON is invalid: {}", kind, e)),
            document: None,
        },
    }
}

/// Check that both templates carry the expected fields and agree on version.
pub fn check_template_consistency(templates: &TemplateSource) -> ValidationReport {
    let mut report = ValidationReport::default();

    let request = templates.request_template();
    let response = templates.response_template();

    let (request, response) = match (request, response) {
        (Ok(request), Ok(response)) => (request, response),
        (Err(e), _) | (_, Err(e)) => {
            report
                .errors
                .push(format!("Template validation error: {}", e));
            return report;
        }
    };

    for field in REQUEST_EXPECTED_FIELDS {
        if !request.contains_key(field) {
            report
                .errors
                .push(format!("Request template missing field: {}", field));
        }
    }
    for field in RESPONSE_REQUIRED_FIELDS {
        if !response.contains_key(field) {
            report
                .errors
                .push(format!("Response template missing field: {}", field));
        }
    }

    if request.get("version") != response.get("version") {
        report.warnings.push(format!(
            "Version mismatch: request={}, response={}",
            request.get("version").unwrap_or(&Value::Null),
            response.get("version").unwrap_or(&Value::Null)
        ));
    }

    report
}

fn compare_fields(
    kind: &str,
    template: &Map<String, Value>,
    actual: &Map<String, Value>,
    report: &mut ValidationReport,
) {
    let expected: BTreeSet<&str> = template.keys().map(String::as_str).collect();
    let present: BTreeSet<&str> = actual.keys().map(String::as_str).collect();

    let missing: Vec<&str> = expected.difference(&present).copied().collect();
    if !missing.is_empty() {
        report
            .errors
            .push(format!("{} JSON missing fields: {}", kind, missing.join(", ")));
    }

    let extra: Vec<&str> = present.difference(&expected).copied().collect();
    if !extra.is_empty() {
        report.errors.push(format!(
            "{} JSON has extra fields not in template: {}",
            kind,
            extra.join(", ")
        ));
    }
}
