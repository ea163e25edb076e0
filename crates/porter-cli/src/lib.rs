//! Porter command line
//!
//! ```text
//! porter migrate <repository> <source> <target> [--dry-run] [--verbose]
//!        [--skip-validation] [--config <path>] [--log-format text|json]
//! porter repositories [--config <path>]
//! ```
//!
//! Exit codes: 0 success, 1 migration failure, 2 invalid arguments or
//! configuration, 3 inaccessible repository.

#![warn(missing_docs)]

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use porter_core::{ConfigProblem, MigrationError, MigrationOutcome, RunFailure};
use porter_model::{MigrationOptions, MigrationRequest};
use std::fmt::Write;
use std::path::PathBuf;
use std::str::FromStr;

/// Default registry location
pub const DEFAULT_CONFIG: &str = "config/repositories.toml";

/// Environment variable overriding the registry location
pub const CONFIG_ENV: &str = "PORTER_CONFIG";

/// Exit status
pub mod exit {
    /// Migration finished
    pub const SUCCESS: i32 = 0;
    /// Migration failed
    pub const FAILURE: i32 = 1;
    /// Bad arguments or configuration
    pub const USAGE: i32 = 2;
    /// Repository path or `git` unusable
    pub const INACCESSIBLE: i32 = 3;
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}', expected text or json")),
        }
    }
}

/// Parsed invocation
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Run a migration
    Migrate {
        /// What to migrate
        request: MigrationRequest,
        /// Registry file
        config: PathBuf,
        /// Log format
        log_format: LogFormat,
    },
    /// List configured repositories
    Repositories {
        /// Registry file
        config: PathBuf,
    },
}

impl CliCommand {
    /// Whether debug logging was requested
    #[must_use]
    pub fn verbose(&self) -> bool {
        match self {
            Self::Migrate { request, .. } => request.options.verbose,
            Self::Repositories { .. } => false,
        }
    }

    /// Requested log format
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        match self {
            Self::Migrate { log_format, .. } => *log_format,
            Self::Repositories { .. } => LogFormat::Text,
        }
    }
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .env(CONFIG_ENV)
        .default_value(DEFAULT_CONFIG)
        .value_parser(value_parser!(PathBuf))
        .help("Repository registry (TOML or YAML)")
}

/// Command definition
#[must_use]
pub fn command() -> Command {
    Command::new("porter")
        .version(porter_core::VERSION)
        .about("Migrate commits between branches, adapted to the target's patterns")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("migrate")
                .about("Replay source-only commits onto the target branch")
                .arg(Arg::new("repository").required(true).help("Configured repository id"))
                .arg(Arg::new("source").required(true).help("Branch to migrate from"))
                .arg(Arg::new("target").required(true).help("Branch to migrate to"))
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Plan and report without changing the repository"),
                )
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .short('v')
                        .action(ArgAction::SetTrue)
                        .help("Debug logging"),
                )
                .arg(
                    Arg::new("skip-validation")
                        .long("skip-validation")
                        .action(ArgAction::SetTrue)
                        .help("Do not stop on high-severity rule violations"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("log-format")
                        .long("log-format")
                        .default_value("text")
                        .value_parser(LogFormat::from_str)
                        .help("Log output: text or json"),
                ),
        )
        .subcommand(
            Command::new("repositories")
                .about("List configured repositories")
                .arg(config_arg()),
        )
}

fn required(matches: &ArgMatches, name: &str) -> anyhow::Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing argument <{name}>"))
}

fn config_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

/// Interpret parsed arguments
///
/// # Errors
///
/// Returns an error when a required argument is missing or the subcommand
/// is unknown.
pub fn parse(matches: &ArgMatches) -> anyhow::Result<CliCommand> {
    match matches.subcommand() {
        Some(("migrate", args)) => {
            let options = MigrationOptions::default()
                .with_dry_run(args.get_flag("dry-run"))
                .with_verbose(args.get_flag("verbose"))
                .with_skip_validation(args.get_flag("skip-validation"));
            let request = MigrationRequest::new(
                required(args, "repository")?,
                required(args, "source")?,
                required(args, "target")?,
            )
            .with_options(options);
            Ok(CliCommand::Migrate {
                request,
                config: config_path(args),
                log_format: args.get_one::<LogFormat>("log-format").copied().unwrap_or_default(),
            })
        }
        Some(("repositories", args)) => Ok(CliCommand::Repositories {
            config: config_path(args),
        }),
        Some((other, _)) => anyhow::bail!("unknown command '{other}'"),
        None => anyhow::bail!("no command given"),
    }
}

/// Exit status for a migration error
#[must_use]
pub fn exit_code(error: &MigrationError) -> i32 {
    match error.config_problem() {
        Some(ConfigProblem::UnknownRepository | ConfigProblem::MissingBranch | ConfigProblem::InvalidDocument) => {
            exit::USAGE
        }
        Some(ConfigProblem::InaccessibleRepository) => exit::INACCESSIBLE,
        _ => exit::FAILURE,
    }
}

/// Final summary of a successful run
#[must_use]
pub fn render_outcome(outcome: &MigrationOutcome) -> String {
    let mut out = String::new();
    let state = &outcome.state;
    let _ = writeln!(out, "Migration {}: {}", outcome.run_id, outcome.status);
    let _ = writeln!(out, "  Phase: {} ({}%)", state.phase, state.progress);
    let _ = writeln!(out, "  Commits migrated: {}", outcome.migrated_count());
    if !state.skipped.is_empty() {
        let _ = writeln!(out, "  Commits skipped: {}", state.skipped.len());
    }
    if let Some(compliance) = outcome.average_compliance {
        let _ = writeln!(out, "  Average compliance: {:.1}%", compliance * 100.0);
    }
    if !state.issues.is_empty() {
        let _ = writeln!(out, "  Issues ({}):", state.issues.len());
        for issue in &state.issues {
            let _ = writeln!(out, "    - {issue}");
        }
    }
    if let Some(dir) = &outcome.report_dir {
        let _ = writeln!(out, "  Reports: {}", dir.display());
    }
    out
}

/// Final summary of a failed run
#[must_use]
pub fn render_failure(failure: &RunFailure) -> String {
    let mut out = String::new();
    let state = &failure.state;
    let _ = writeln!(out, "Migration {} FAILED", failure.run_id);
    let _ = writeln!(out, "  Error: {}", failure.error);
    let _ = writeln!(out, "  Rollback: {}", failure.rollback);
    for step in failure.rollback.steps() {
        if let Some(error) = &step.error {
            let _ = writeln!(out, "    - {} failed: {error}", step.action);
        }
    }
    if !state.issues.is_empty() {
        let _ = writeln!(out, "  Issues ({}):", state.issues.len());
        for issue in &state.issues {
            let _ = writeln!(out, "    - {issue}");
        }
    }
    if failure.error.requires_manual_resolution() {
        out.push_str("  Resolve the conflicts manually, then retry.\n");
    } else if failure.error.is_retryable() {
        out.push_str("  The failure may be transient; retry the migration.\n");
    }
    if let Some(dir) = &failure.report_dir {
        let _ = writeln!(out, "  Reports: {}", dir.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsing() {
        assert_eq!("JSON".parse(), Ok(LogFormat::Json));
        assert_eq!("text".parse(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn exit_codes_by_problem() {
        let code = |problem| exit_code(&MigrationError::configuration(problem, "x"));
        assert_eq!(code(ConfigProblem::UnknownRepository), exit::USAGE);
        assert_eq!(code(ConfigProblem::MissingBranch), exit::USAGE);
        assert_eq!(code(ConfigProblem::InvalidDocument), exit::USAGE);
        assert_eq!(code(ConfigProblem::InaccessibleRepository), exit::INACCESSIBLE);
        assert_eq!(code(ConfigProblem::DirtyWorkingTree), exit::FAILURE);
        assert_eq!(exit_code(&MigrationError::Report("x".into())), exit::FAILURE);
    }
}
