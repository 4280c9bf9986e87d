// src/step/mod.rs

//! The orchestrator-facing build step.
//!
//! A [`BuildStep`] is constructed from the job's configuration and run once
//! per job execution:
//!
//! 1. the project selection is validated (nothing is launched if blank),
//! 2. a start marker is written to the build log,
//! 3. the command for the project is run through the [`CommandExecutor`],
//! 4. the full combined output is written to the build log,
//! 5. launch errors, interrupts and non-zero exits become a [`BuildFailure`].
//!
//! The pure lifecycle lives in [`state`]; command selection is delegated to a
//! [`CommandResolver`].

pub mod resolver;
pub mod state;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::errors::BuildFailure;
use crate::exec::{CancellationToken, CommandExecutor, ExecutionChannel};
use crate::types::{CommandSpec, ProjectSelection};

pub use resolver::{CommandResolver, PLACEHOLDER_COMMAND, PlaceholderCommand};
pub use state::{IllegalTransition, StepState};

/// First line every run writes to the build log.
pub const START_MARKER: &str = "[NODE] Start plugin.";

/// Message for a run without a project selection.
pub const NO_PROJECT_SELECTED: &str =
    "You did not select a project. Please go to your job configuration and select one from the list.";

/// Environment variable carrying the workspace path into the command.
pub const WORKSPACE_VAR: &str = "WORKSPACE";
/// Environment variable carrying the selected project into the command.
pub const PROJECT_VAR: &str = "PROJECT";

pub struct BuildStep {
    resolver: Arc<dyn CommandResolver>,
    environment: BTreeMap<String, String>,
    inherit_env: bool,
    executor: CommandExecutor,
    state: StepState,
}

impl BuildStep {
    /// Step that runs [`PLACEHOLDER_COMMAND`].
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(PlaceholderCommand::default()))
    }

    pub fn with_resolver(resolver: Arc<dyn CommandResolver>) -> Self {
        Self {
            resolver,
            environment: BTreeMap::new(),
            inherit_env: true,
            executor: CommandExecutor::new(),
            state: StepState::Idle,
        }
    }

    /// Extra environment for the command. [`WORKSPACE_VAR`] and
    /// [`PROJECT_VAR`] are always set by the step and win over these.
    pub fn environment(mut self, vars: BTreeMap<String, String>) -> Self {
        self.environment = vars;
        self
    }

    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Run the step once.
    ///
    /// Everything the process printed is in `log` before an error is
    /// returned, so the cause of a failure can be read from the log alone.
    pub async fn run(
        mut self,
        project: &ProjectSelection,
        workspace: &Path,
        channel: &dyn ExecutionChannel,
        log: &mut (dyn Write + Send),
        cancel: &CancellationToken,
    ) -> Result<(), BuildFailure> {
        let result = self.run_inner(project, workspace, channel, log, cancel).await;

        match &result {
            Ok(()) => {
                self.advance(StepState::Completed);
                info!(project = %project, node = %channel.node_name(), "build step succeeded");
            }
            Err(failure) => {
                self.advance(StepState::Failed(failure.kind()));
                error!(
                    project = %project,
                    node = %channel.node_name(),
                    error = %failure,
                    "build step failed"
                );
            }
        }

        result
    }

    async fn run_inner(
        &mut self,
        project: &ProjectSelection,
        workspace: &Path,
        channel: &dyn ExecutionChannel,
        log: &mut (dyn Write + Send),
        cancel: &CancellationToken,
    ) -> Result<(), BuildFailure> {
        self.advance(StepState::Validating);
        if project.is_blank() {
            return Err(BuildFailure::Configuration(NO_PROJECT_SELECTED.to_string()));
        }

        writeln!(log, "{START_MARKER}").map_err(BuildFailure::Log)?;

        let spec = self.command_spec(project, workspace);

        self.advance(StepState::Launching);
        let result = match self.executor.execute(&spec, channel, cancel).await {
            Ok(result) => result,
            Err(err) => {
                // Best effort: the error itself is what the caller needs.
                let _ = writeln!(log, "ERROR: {err}");
                let _ = log.flush();
                return Err(err.into());
            }
        };

        self.advance(StepState::Streaming);
        write_output(log, &result.combined_output).map_err(BuildFailure::Log)?;

        if result.exit_code != 0 {
            let failure = BuildFailure::NonZeroExit {
                code: result.exit_code,
            };
            writeln!(log, "ERROR: {failure}").map_err(BuildFailure::Log)?;
            log.flush().map_err(BuildFailure::Log)?;
            return Err(failure);
        }

        log.flush().map_err(BuildFailure::Log)?;
        Ok(())
    }

    fn command_spec(&self, project: &ProjectSelection, workspace: &Path) -> CommandSpec {
        CommandSpec::new(self.resolver.resolve(project), workspace)
            .with_envs(self.environment.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .with_env(WORKSPACE_VAR, workspace.to_string_lossy())
            .with_env(PROJECT_VAR, project.as_str())
            .inherit_env(self.inherit_env)
    }

    fn advance(&mut self, next: StepState) {
        let from = self.state;
        match self.state.transition(next) {
            Ok(()) => debug!(from = ?from, to = ?next, "build step state"),
            // Only reachable through a bug in this module.
            Err(illegal) => error!(error = %illegal, "ignoring build step transition"),
        }
    }
}

impl Default for BuildStep {
    fn default() -> Self {
        Self::new()
    }
}

/// Write process output in full, ending with a newline.
fn write_output(log: &mut (dyn Write + Send), output: &[u8]) -> std::io::Result<()> {
    log.write_all(output)?;
    if !output.is_empty() && !output.ends_with(b"\n") {
        log.write_all(b"\n")?;
    }
    Ok(())
}
