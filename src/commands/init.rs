//! Implementation of the `subrun init` command.
//!
//! Creates `<audit_root>/<phase>/<task>/<subagent>/` and reports where the
//! request and response belong. With `--copy-template` a placeholder request
//! is written from the request template, unless one already exists.

use super::{load_config, templates_for};
use crate::audit::{AuditPaths, AuditSelector};
use crate::cli::{InitArgs, OutputFormat};
use crate::error::Result;
use crate::exit_codes;
use crate::fs::write_json_pretty;
use crate::schema::TemplateSource;
use serde_json::{Value, json};
use std::path::Path;

/// Execute the `subrun init` command.
pub fn cmd_init(args: InitArgs) -> Result<i32> {
    let config = load_config(&args.config)?;

    let paths = AuditPaths::resolve(&AuditSelector {
        audit_root: args.audit.audit_root.unwrap_or(config.audit_root.clone()),
        phase: args.audit.phase,
        task: args.audit.task,
        subagent: args.audit.subagent,
        request: None,
        response: None,
    })?;

    let created_request = if args.copy_template {
        copy_request_template(&paths.request, &templates_for(&config))?
    } else {
        false
    };

    match args.output_format {
        OutputFormat::Json => {
            let summary = json!({
                "directory": paths.output_dir().display().to_string(),
                "request": paths.request.display().to_string(),
                "response": paths.response.display().to_string(),
                "created_request": created_request,
            });
            println!("{}", summary);
        }
        OutputFormat::Text => {
            println!("Directory: {}", paths.output_dir().display());
            println!("Request:   {}", paths.request.display());
            println!("Response:  {}", paths.response.display());
            if created_request {
                println!();
                println!("Wrote placeholder request from template; fill it in before running.");
            }
        }
    }

    Ok(exit_codes::SUCCESS)
}

/// Write the request template to `path` unless a request is already there.
/// Returns whether a file was written.
fn copy_request_template(path: &Path, templates: &TemplateSource) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    let template = Value::Object(templates.request_template()?);
    write_json_pretty(path, &template)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{REQUEST_EXPECTED_FIELDS, validate_request_file};
    use tempfile::TempDir;

    #[test]
    fn copy_template_writes_placeholder_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("request.json");
        let templates = TemplateSource::builtin();

        assert!(copy_request_template(&path, &templates).unwrap());
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for field in REQUEST_EXPECTED_FIELDS {
            assert!(written.get(field).is_some(), "missing {}", field);
        }
        assert!(validate_request_file(&path, &templates).report.is_valid());

        std::fs::write(&path, "{\"task\": \"mine\"}").unwrap();
        assert!(!copy_request_template(&path, &templates).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"task\": \"mine\"}");
    }

    #[test]
    fn init_creates_subagent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let args = InitArgs {
            audit: crate::cli::AuditArgs {
                phase: Some("p1".to_string()),
                task: Some("t1".to_string()),
                subagent: Some("coder".to_string()),
                audit_root: Some(temp_dir.path().join("audit")),
            },
            copy_template: true,
            output_format: OutputFormat::Json,
            config: temp_dir.path().join("missing.yaml"),
        };

        assert_eq!(cmd_init(args).unwrap(), exit_codes::SUCCESS);
        let dir = temp_dir.path().join("audit/p1/t1/coder");
        assert!(dir.is_dir());
        assert!(dir.join("request.json").is_file());
        assert!(!dir.join("response.json").exists());
    }

    #[test]
    fn init_requires_full_selector() {
        let temp_dir = TempDir::new().unwrap();
        let args = InitArgs {
            audit: crate::cli::AuditArgs {
                phase: Some("p1".to_string()),
                task: None,
                subagent: None,
                audit_root: Some(temp_dir.path().to_path_buf()),
            },
            copy_template: false,
            output_format: OutputFormat::Text,
            config: temp_dir.path().join("missing.yaml"),
        };

        let err = cmd_init(args).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }
}
