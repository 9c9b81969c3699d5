//! Document schema: templates, validation, and the response contract.
//!
//! The supervisor depends on this module only through [`ResponseContract`]:
//! what a response must look like and which defaults a synthesized response
//! starts from. The `validate-*` and `templates` commands use the full API.

mod templates;
mod validate;

pub use templates::{
    DEFAULT_VERSION, REQUEST_EXPECTED_FIELDS, RESPONSE_REQUIRED_FIELDS, TemplateSource,
    VALID_STATUSES, builtin_request_template, builtin_response_template, find_template_dir,
    response_defaults,
};
pub use validate::{
    FileValidation, ValidationReport, check_template_consistency, validate_request,
    validate_request_file, validate_response, validate_response_file,
};

use crate::error::Result;
use serde_json::{Map, Value};

/// Defaults for a synthesized response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDefaults {
    pub version: String,
    pub fields: Map<String, Value>,
}

/// The external response contract, as seen by the supervisor.
pub trait ResponseContract {
    /// Check a response document against the contract.
    fn validate(&self, document: &Value) -> ValidationReport;

    /// Default field values for a synthesized response.
    fn defaults(&self) -> Result<ResponseDefaults>;
}

impl ResponseContract for TemplateSource {
    fn validate(&self, document: &Value) -> ValidationReport {
        validate_response(document, self, true)
    }

    fn defaults(&self) -> Result<ResponseDefaults> {
        let template = self.response_template()?;
        let version = template
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_VERSION)
            .to_string();

        Ok(ResponseDefaults {
            version,
            fields: response_defaults(&template),
        })
    }
}
