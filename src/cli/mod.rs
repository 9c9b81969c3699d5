//! CLI argument parsing for subrun.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::SandboxMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default location of the optional YAML config.
pub const DEFAULT_CONFIG_PATH: &str = ".agent/subrun.yaml";

/// Subrun: supervised execution of a delegated subagent CLI.
///
/// A subagent receives a request document and must leave a response
/// document behind. Subrun runs it, kills it when its diagnostic stream
/// goes quiet for too long, and guarantees a well-formed response exists
/// afterward.
#[derive(Parser, Debug)]
#[command(name = "subrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for subrun.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a subagent on a request and collect its response.
    ///
    /// Validates the request, launches the subagent CLI under the idle
    /// watchdog, and writes a fallback response if it fails to produce one.
    Run(RunArgs),

    /// Create the audit directory for a subagent.
    ///
    /// Prints the request and response paths for the phase/task/subagent.
    Init(InitArgs),

    /// Validate a request document against the request template.
    ValidateRequest(ValidateRequestArgs),

    /// Validate a response document against the response template.
    ValidateResponse(ValidateResponseArgs),

    /// Check the request and response templates for consistency.
    Templates(TemplatesArgs),
}

/// Where a subagent's request and response live.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AuditArgs {
    /// Phase identifier (e.g., design, implement).
    #[arg(long)]
    pub phase: Option<String>,

    /// Task identifier.
    #[arg(long)]
    pub task: Option<String>,

    /// Subagent name.
    #[arg(long)]
    pub subagent: Option<String>,

    /// Root of the audit tree [config: audit_root].
    #[arg(long)]
    pub audit_root: Option<PathBuf>,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub audit: AuditArgs,

    /// Explicit request path (use with --response).
    #[arg(long, requires = "response")]
    pub request: Option<PathBuf>,

    /// Explicit response path (use with --request).
    #[arg(long, requires = "request")]
    pub response: Option<PathBuf>,

    /// Base prompt file [config: prompt_file].
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Subagent CLI executable [config: codex_cmd].
    #[arg(long)]
    pub codex_cmd: Option<String>,

    /// Profile passed to the subagent CLI.
    #[arg(long)]
    pub profile: Option<String>,

    /// Sandbox mode passed to the subagent CLI.
    #[arg(long, value_enum)]
    pub sandbox: Option<SandboxMode>,

    /// Working directory for the subagent [config: working_dir].
    #[arg(long = "cd")]
    pub working_dir: Option<PathBuf>,

    /// Pass --skip-git-repo-check to the subagent CLI.
    #[arg(long)]
    pub skip_git_repo_check: bool,

    /// Seconds of stderr silence before the subagent is killed.
    #[arg(long)]
    pub idle_timeout: Option<u64>,

    /// Config file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Extra arguments passed through to the subagent CLI (after `--`).
    #[arg(last = true)]
    pub codex_args: Vec<String>,
}

/// Arguments for the `init` command.
#[derive(Parser, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub audit: AuditArgs,

    /// Copy the request template as a placeholder request.
    #[arg(long)]
    pub copy_template: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Config file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Arguments for the `validate-request` command.
#[derive(Parser, Debug)]
pub struct ValidateRequestArgs {
    /// Path to the request JSON.
    pub path: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Config file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Arguments for the `validate-response` command.
#[derive(Parser, Debug)]
pub struct ValidateResponseArgs {
    /// Path to the response JSON.
    pub path: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Only check that the file is valid JSON.
    #[arg(long)]
    pub no_field_check: bool,

    /// Also require this status.
    #[arg(long, value_enum)]
    pub check_status: Option<ResponseStatus>,

    /// Config file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Arguments for the `templates` command.
#[derive(Parser, Debug)]
pub struct TemplatesArgs {
    /// Print the request template and its required fields.
    #[arg(long)]
    pub show_request: bool,

    /// Print the response template, its required fields and defaults.
    #[arg(long)]
    pub show_response: bool,

    /// Config file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Response statuses accepted by `--check-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResponseStatus {
    Success,
    Partial,
    Failed,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStatus::Success => "success",
            ResponseStatus::Partial => "partial",
            ResponseStatus::Failed => "failed",
        }
    }
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_with_audit_selector() {
        let cli = Cli::try_parse_from([
            "subrun",
            "run",
            "--phase",
            "design",
            "--task",
            "T-1",
            "--subagent",
            "reviewer",
        ])
        .unwrap();

        if let Command::Run(args) = cli.command {
            assert_eq!(args.audit.phase.as_deref(), Some("design"));
            assert_eq!(args.audit.task.as_deref(), Some("T-1"));
            assert_eq!(args.audit.subagent.as_deref(), Some("reviewer"));
            assert!(args.request.is_none());
            assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
            assert!(args.codex_args.is_empty());
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_run_full() {
        let cli = Cli::try_parse_from([
            "subrun",
            "-v",
            "run",
            "--request",
            "req.json",
            "--response",
            "resp.json",
            "--sandbox",
            "workspace-write",
            "--cd",
            "/work",
            "--idle-timeout",
            "30",
            "--skip-git-repo-check",
            "--",
            "--model",
            "o3",
        ])
        .unwrap();

        assert!(cli.verbose);
        if let Command::Run(args) = cli.command {
            assert_eq!(args.request, Some(PathBuf::from("req.json")));
            assert_eq!(args.response, Some(PathBuf::from("resp.json")));
            assert_eq!(args.sandbox, Some(SandboxMode::WorkspaceWrite));
            assert_eq!(args.working_dir, Some(PathBuf::from("/work")));
            assert_eq!(args.idle_timeout, Some(30));
            assert!(args.skip_git_repo_check);
            assert_eq!(args.codex_args, vec!["--model", "o3"]);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn request_requires_response() {
        let result = Cli::try_parse_from(["subrun", "run", "--request", "req.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_validate_response() {
        let cli = Cli::try_parse_from([
            "subrun",
            "validate-response",
            "resp.json",
            "--check-status",
            "success",
            "--output-format",
            "json",
        ])
        .unwrap();

        if let Command::ValidateResponse(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("resp.json"));
            assert_eq!(args.check_status, Some(ResponseStatus::Success));
            assert_eq!(args.output_format, OutputFormat::Json);
            assert!(!args.no_field_check);
        } else {
            panic!("Expected ValidateResponse command");
        }
    }

    #[test]
    fn parse_init_and_templates() {
        let cli = Cli::try_parse_from([
            "subrun",
            "init",
            "--phase",
            "p",
            "--task",
            "t",
            "--subagent",
            "s",
            "--copy-template",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Init(ref args) if args.copy_template));

        let cli = Cli::try_parse_from(["subrun", "templates", "--show-response"]).unwrap();
        assert!(matches!(cli.command, Command::Templates(ref args) if args.show_response));
    }

    #[test]
    fn invalid_sandbox_rejected() {
        let result = Cli::try_parse_from(["subrun", "run", "--sandbox", "everything"]);
        assert!(result.is_err());
    }
}
