//! Implementation of the `subrun run` command.
//!
//! # Steps
//!
//! 1. Load config and apply CLI overrides
//! 2. Resolve request/response paths
//! 3. Validate the request (fatal errors abort before launch)
//! 4. Render the prompt and run the supervisor
//! 5. Validate the response best-effort (warnings only)

use super::load_config;
use crate::audit::{AuditPaths, AuditSelector};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{Result, SubrunError};
use crate::info::InfoFile;
use crate::prompt::{build_prompt, load_prompt};
use crate::request::ExecutionRequest;
use crate::schema::{TemplateSource, validate_request_file, validate_response_file};
use crate::supervisor::{self, Invocation, RunPlan, SupervisorSettings};

/// Execute the `subrun run` command.
pub fn cmd_run(args: RunArgs) -> Result<i32> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let paths = AuditPaths::resolve(&AuditSelector {
        audit_root: args
            .audit
            .audit_root
            .clone()
            .unwrap_or_else(|| config.audit_root.clone()),
        phase: args.audit.phase.clone(),
        task: args.audit.task.clone(),
        subagent: args.audit.subagent.clone(),
        request: args.request.clone(),
        response: args.response.clone(),
    })?;

    let templates = TemplateSource::discover(config.templates_dir.as_deref(), &config.working_dir);

    let validation = validate_request_file(&paths.request, &templates);
    let fatal = validation.report.fatal_errors();
    if !fatal.is_empty() {
        return Err(SubrunError::ValidationError(format!(
            "request {}:\n  {}",
            paths.request.display(),
            fatal.join("\n  ")
        )));
    }
    for warning in validation
        .report
        .errors
        .iter()
        .chain(&validation.report.warnings)
        .filter(|message| !fatal.contains(&message.as_str()))
    {
        tracing::warn!(request = %paths.request.display(), "{}", warning);
    }

    let request = ExecutionRequest::load(&paths.request)?;
    let prompt = build_prompt(&load_prompt(&config.prompt_file)?, &request)?;

    let mut extra_args = config.extra_args()?;
    extra_args.extend(args.codex_args.iter().cloned());

    let plan = RunPlan {
        invocation: Invocation {
            program: config.codex_cmd.clone(),
            profile: config.profile.clone(),
            sandbox: config.sandbox,
            working_dir: config.working_dir.clone(),
            skip_git_repo_check: config.skip_git_repo_check,
            output_path: paths.response.clone(),
            extra_args,
        },
        prompt,
        task_id: request.task_id().to_string(),
        stderr_path: paths.stderr_path(),
    };

    let mut recorder = InfoFile::new(paths.info_path(), templates.info_version());
    let report = supervisor::execute(
        &plan,
        &SupervisorSettings::from_config(&config),
        &templates,
        &mut recorder,
    )?;

    let check = validate_response_file(&paths.response, &templates, true);
    for error in check.report.errors.iter().chain(&check.report.warnings) {
        tracing::warn!(response = %paths.response.display(), "response validation: {}", error);
    }

    println!("Outcome:  {}", report.outcome);
    println!("Response: {}", paths.response.display());
    println!("Stderr:   {}", paths.stderr_path().display());

    Ok(report.exit_code)
}

/// Layer command-line flags over the config file.
fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(cmd) = &args.codex_cmd {
        config.codex_cmd = cmd.clone();
    }
    if let Some(profile) = &args.profile {
        config.profile = Some(profile.clone());
    }
    if let Some(sandbox) = args.sandbox {
        config.sandbox = Some(sandbox);
    }
    if let Some(dir) = &args.working_dir {
        config.working_dir = dir.clone();
    }
    if args.skip_git_repo_check {
        config.skip_git_repo_check = true;
    }
    if let Some(seconds) = args.idle_timeout {
        config.idle_timeout_seconds = seconds;
    }
    if let Some(prompt_file) = &args.prompt_file {
        config.prompt_file = prompt_file.clone();
    }
}
