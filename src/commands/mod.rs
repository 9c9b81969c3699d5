//! Command implementations for subrun.
//!
//! Each handler returns the process exit code on success; errors carry
//! their own exit code via [`SubrunError::exit_code`].
//!
//! [`SubrunError::exit_code`]: crate::error::SubrunError::exit_code

mod init;
mod run;
mod templates;
mod validate;

use crate::cli::Command;
use crate::config::Config;
use crate::error::Result;
use crate::schema::TemplateSource;
use std::path::Path;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Run(args) => run::cmd_run(args),
        Command::Init(args) => init::cmd_init(args),
        Command::ValidateRequest(args) => validate::cmd_validate_request(args),
        Command::ValidateResponse(args) => validate::cmd_validate_response(args),
        Command::Templates(args) => templates::cmd_templates(args),
    }
}

/// Load and validate the config file; a missing file means defaults.
fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    config.validate()?;
    Ok(config)
}

/// Template source for commands that are not tied to a run directory.
fn templates_for(config: &Config) -> TemplateSource {
    let start = std::env::current_dir().unwrap_or_else(|_| config.working_dir.clone());
    TemplateSource::discover(config.templates_dir.as_deref(), &start)
}
