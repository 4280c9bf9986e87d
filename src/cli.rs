// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The binary plays the orchestrator's part: it loads a job file, runs the
//! build step once and reports the result through its exit status.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `projectstep`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "projectstep",
    version,
    about = "Run a project's build step on a local or remote node.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Project to build, overriding `[step].project`.
    #[arg(long, value_name = "NAME")]
    pub project: Option<String>,

    /// Working directory for the command, overriding `[step].workspace`.
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Print the selectable projects and exit.
    #[arg(long)]
    pub list_projects: bool,

    /// Validate the job file and show what would run, without running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROJECTSTEP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::try_parse_from(["projectstep"]).expect("parse");
        assert_eq!(args.config, default_config_path());
        assert!(args.project.is_none());
        assert!(!args.dry_run);
        assert!(!args.list_projects);
    }

    #[test]
    fn overrides() {
        let args = CliArgs::try_parse_from([
            "projectstep",
            "--config",
            "jobs/a.toml",
            "--project",
            "project2",
            "--workspace",
            "/tmp/ws",
            "--log-level",
            "debug",
            "--dry-run",
        ])
        .expect("parse");
        assert_eq!(args.config, PathBuf::from("jobs/a.toml"));
        assert_eq!(args.project.as_deref(), Some("project2"));
        assert_eq!(args.workspace, Some(PathBuf::from("/tmp/ws")));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
    }
}
