// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ExecError`] is what the command executor and execution channels
//!   report.
//! - [`BuildFailure`] is what a build step raises to the orchestrator.
//! - [`ProjectStepError`] covers everything around a step: loading the job
//!   file, talking to the terminal, etc.

use std::io;

use thiserror::Error;

/// Failure while launching or waiting for a command.
///
/// A non-zero exit code is *not* an `ExecError`; interpreting the exit code
/// is the caller's job.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("command line is empty")]
    EmptyCommand,

    #[error("invalid command line: {0}")]
    InvalidCommandLine(String),

    #[error("failed to launch '{program}' on {node}: {source}")]
    Launch {
        program: String,
        node: String,
        #[source]
        source: io::Error,
    },

    #[error("lost track of '{program}' on {node}: {source}")]
    Wait {
        program: String,
        node: String,
        #[source]
        source: io::Error,
    },

    #[error("interrupted while waiting for '{program}' on {node}")]
    Interrupted { program: String, node: String },
}

/// Coarse classification of a failed build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Execution,
    NonZeroExit,
}

/// Signal that a build step failed and the job should be marked failed.
#[derive(Error, Debug)]
pub enum BuildFailure {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Execution(#[from] ExecError),

    #[error("process failed with exit code {code}")]
    NonZeroExit { code: i32 },

    #[error("failed to write build log: {0}")]
    Log(#[source] io::Error),
}

impl BuildFailure {
    /// Exit code of the failed process, if the failure came from one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BuildFailure::NonZeroExit { code } => Some(*code),
            _ => None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            BuildFailure::Configuration(_) => FailureKind::Configuration,
            BuildFailure::NonZeroExit { .. } => FailureKind::NonZeroExit,
            BuildFailure::Execution(_) | BuildFailure::Log(_) => FailureKind::Execution,
        }
    }

    /// True if the failure was caused by cancelling the job.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, BuildFailure::Execution(ExecError::Interrupted { .. }))
    }
}

#[derive(Error, Debug)]
pub enum ProjectStepError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Build failed: {0}")]
    Build(#[from] BuildFailure),
}

pub type Result<T> = std::result::Result<T, ProjectStepError>;
