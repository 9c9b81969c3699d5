//! Implementation of the `subrun templates` command.

use super::{load_config, templates_for};
use crate::cli::TemplatesArgs;
use crate::error::{Result, SubrunError};
use crate::exit_codes;
use crate::schema::{
    RESPONSE_REQUIRED_FIELDS, TemplateSource, check_template_consistency, response_defaults,
};
use serde_json::{Map, Value};
use std::io;

/// Execute the `subrun templates` command.
pub fn cmd_templates(args: TemplatesArgs) -> Result<i32> {
    let config = load_config(&args.config)?;
    let templates = templates_for(&config);

    match templates.dir() {
        Some(dir) => println!("Templates: {}", dir.display()),
        None => println!("Templates: built-in"),
    }

    let report = check_template_consistency(&templates);
    if report.is_valid() {
        println!("Templates are consistent.");
    } else {
        println!("Template errors:");
        for error in &report.errors {
            println!("  - {}", error);
        }
    }
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }

    if args.show_request {
        show_request(&templates)?;
    }
    if args.show_response {
        show_response(&templates)?;
    }

    Ok(if report.is_valid() {
        exit_codes::SUCCESS
    } else {
        exit_codes::FAILURE
    })
}

fn show_request(templates: &TemplateSource) -> Result<()> {
    let template = templates.request_template()?;

    println!();
    println!("Request template:");
    println!("{}", pretty(&template)?);
    println!("Required fields: {}", field_list(&template));
    Ok(())
}

fn show_response(templates: &TemplateSource) -> Result<()> {
    let template = templates.response_template()?;

    println!();
    println!("Response template:");
    println!("{}", pretty(&template)?);
    println!("Required fields: {}", RESPONSE_REQUIRED_FIELDS.join(", "));
    println!("Defaults:");
    println!("{}", pretty(&response_defaults(&template))?);
    Ok(())
}

/// A request must carry every key its template defines.
fn field_list(template: &Map<String, Value>) -> String {
    template.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn pretty(map: &Map<String, Value>) -> Result<String> {
    serde_json::to_string_pretty(map)
        .map_err(|e| SubrunError::io("failed to render template", io::Error::other(e)))
}
