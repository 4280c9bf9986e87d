// src/step/resolver.rs

//! Mapping from a selected project to the command line a step runs.

use crate::types::ProjectSelection;

/// Command run when nothing better is configured.
pub const PLACEHOLDER_COMMAND: &str = "echo test";

/// Turns a project selection into a command line.
///
/// Injected into [`BuildStep`](super::BuildStep) so the step itself holds no
/// knowledge of what a project builds with.
pub trait CommandResolver: Send + Sync {
    fn resolve(&self, project: &ProjectSelection) -> String;
}

/// Runs the same command regardless of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderCommand {
    command_line: String,
}

impl PlaceholderCommand {
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
        }
    }
}

impl Default for PlaceholderCommand {
    fn default() -> Self {
        Self::new(PLACEHOLDER_COMMAND)
    }
}

impl CommandResolver for PlaceholderCommand {
    fn resolve(&self, _project: &ProjectSelection) -> String {
        self.command_line.clone()
    }
}

impl<F> CommandResolver for F
where
    F: Fn(&ProjectSelection) -> String + Send + Sync,
{
    fn resolve(&self, project: &ProjectSelection) -> String {
        self(project)
    }
}
