//! Implementation of the `validate-request` and `validate-response` commands.

use super::{load_config, templates_for};
use crate::cli::{OutputFormat, ValidateRequestArgs, ValidateResponseArgs};
use crate::error::Result;
use crate::exit_codes;
use crate::schema::{FileValidation, ValidationReport, validate_request_file, validate_response_file};
use serde_json::{Value, json};
use std::path::Path;

/// Execute `subrun validate-request`.
pub fn cmd_validate_request(args: ValidateRequestArgs) -> Result<i32> {
    let config = load_config(&args.config)?;
    let checked = validate_request_file(&args.path, &templates_for(&config));

    report(&args.path, "Request", &checked.report, args.output_format);
    Ok(exit_code_for(&checked.report))
}

/// Execute `subrun validate-response`.
pub fn cmd_validate_response(args: ValidateResponseArgs) -> Result<i32> {
    let config = load_config(&args.config)?;
    let mut checked =
        validate_response_file(&args.path, &templates_for(&config), !args.no_field_check);

    if let Some(expected) = args.check_status {
        check_status(&mut checked, expected.as_str());
    }

    report(&args.path, "Response", &checked.report, args.output_format);
    Ok(exit_code_for(&checked.report))
}

/// Require a specific status on a document that otherwise parsed.
fn check_status(checked: &mut FileValidation, expected: &str) {
    let Some(document) = &checked.document else {
        return;
    };

    let actual = document.get("status").and_then(Value::as_str);
    if actual != Some(expected) {
        checked.report.errors.push(format!(
            "Status is {}, expected \"{}\"",
            document.get("status").unwrap_or(&Value::Null),
            expected
        ));
    }
}

fn exit_code_for(report: &ValidationReport) -> i32 {
    if report.is_valid() {
        exit_codes::SUCCESS
    } else {
        exit_codes::FAILURE
    }
}

fn report(path: &Path, kind: &str, report: &ValidationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let output = json!({
                "path": path.display().to_string(),
                "valid": report.is_valid(),
                "errors": report.errors,
                "warnings": report.warnings,
            });
            println!("{}", output);
        }
        OutputFormat::Text => {
            if report.is_valid() {
                println!("{} is valid: {}", kind, path.display());
            } else {
                println!("{} is invalid: {}", kind, path.display());
                for error in &report.errors {
                    println!("  - {}", error);
                }
            }
            for warning in &report.warnings {
                println!("  warning: {}", warning);
            }
        }
    }
}
