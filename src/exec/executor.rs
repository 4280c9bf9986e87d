// src/exec/executor.rs

//! Run one command through an execution channel and collect its result.

use tracing::{debug, info, warn};

use crate::errors::ExecError;
use crate::types::{CommandSpec, ExecutionResult};

use super::cancel::CancellationToken;
use super::channel::{ExecutionChannel, LaunchRequest, OutputBuffer};
use super::tokenize::tokenize;

/// Stateless command runner.
///
/// Each call gets its own output buffer and its own child process, so one
/// executor can serve any number of concurrent invocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Launch `spec` on the node behind `channel` and wait for it to exit.
    ///
    /// The exit code is returned as-is, zero or not. If `cancel` fires while
    /// the process runs, the process is killed and reaped and
    /// [`ExecError::Interrupted`] is returned; captured output is discarded.
    /// There is no timeout.
    pub async fn execute(
        &self,
        spec: &CommandSpec,
        channel: &dyn ExecutionChannel,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, ExecError> {
        let argv = tokenize(spec.command_line())?;
        if argv.is_empty() {
            return Err(ExecError::EmptyCommand);
        }

        let node = channel.node_name().to_string();
        let program = argv[0].clone();

        if cancel.is_cancelled() {
            return Err(ExecError::Interrupted { program, node });
        }

        info!(
            node = %node,
            cmd = %spec.command_line(),
            cwd = %spec.working_directory().display(),
            "launching command"
        );

        let request = LaunchRequest {
            argv,
            cwd: spec.working_directory().to_path_buf(),
            env: spec.environment().clone(),
            inherit_env: spec.inherits_env(),
        };
        let output = OutputBuffer::new();
        let mut handle = channel.launch(request, output.clone()).await?;
        let pid = handle.id();
        debug!(node = %node, pid = ?pid, "process started");

        // Either the process exits on its own, or the job is aborted.
        tokio::select! {
            joined = handle.join() => {
                let exit_code = joined.map_err(|source| ExecError::Wait {
                    program: program.clone(),
                    node: node.clone(),
                    source,
                })?;
                let combined_output = output.take();

                info!(
                    node = %node,
                    pid = ?pid,
                    exit_code,
                    output_bytes = combined_output.len(),
                    "command exited"
                );

                Ok(ExecutionResult { exit_code, combined_output })
            }

            _ = cancel.cancelled() => {
                info!(node = %node, pid = ?pid, "cancellation requested; killing process");
                if let Err(e) = handle.kill().await {
                    warn!(node = %node, pid = ?pid, error = %e, "failed to kill process on cancellation");
                }
                Err(ExecError::Interrupted { program, node })
            }
        }
    }
}
