// src/exec/local.rs

//! Channel that runs processes on this machine with `tokio::process`.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::ExecError;

use super::channel::{BoxFuture, ExecutionChannel, LaunchRequest, OutputBuffer, ProcessHandle};

/// Launches processes on the machine the build step itself runs on.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    node: String,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self {
            node: "local".to_string(),
        }
    }

    /// Same channel, different name in logs (e.g. the agent's hostname).
    pub fn named(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionChannel for LocalChannel {
    fn node_name(&self) -> &str {
        &self.node
    }

    fn launch(
        &self,
        request: LaunchRequest,
        output: OutputBuffer,
    ) -> BoxFuture<'_, Result<Box<dyn ProcessHandle>, ExecError>> {
        Box::pin(async move {
            let process = spawn_local(
                &request.argv,
                Some(&request.cwd),
                &request.env,
                request.inherit_env,
                output,
            )
            .map_err(|source| ExecError::Launch {
                program: request.program().to_string(),
                node: self.node.clone(),
                source,
            })?;
            Ok(Box::new(process) as Box<dyn ProcessHandle>)
        })
    }
}

/// A child process on this machine plus the tasks draining its pipes.
pub(crate) struct LocalProcess {
    child: Child,
    pumps: Vec<JoinHandle<()>>,
}

/// Spawn `argv` locally with piped stdout/stderr feeding `output`.
///
/// `cwd = None` keeps the current directory.
pub(crate) fn spawn_local(
    argv: &[String],
    cwd: Option<&Path>,
    env: &BTreeMap<String, String>,
    inherit_env: bool,
    output: OutputBuffer,
) -> io::Result<LocalProcess> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argv"))?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so a cancel reaches everything the command forks.
    #[cfg(unix)]
    cmd.process_group(0);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    if !inherit_env {
        cmd.env_clear();
    }
    cmd.envs(env);

    let mut child = cmd.spawn()?;
    debug!(program = %program, pid = ?child.id(), "spawned local process");

    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(pump(stdout, output.clone(), "stdout"));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(pump(stderr, output, "stderr"));
    }

    Ok(LocalProcess { child, pumps })
}

/// Copy a pipe into the shared buffer until EOF.
fn pump<R>(mut reader: R, output: OutputBuffer, stream: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => output.append(&chunk[..n]),
                Err(e) => {
                    warn!(stream, error = %e, "reading process output failed");
                    break;
                }
            }
        }
    })
}

impl ProcessHandle for LocalProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn join(&mut self) -> BoxFuture<'_, io::Result<i32>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            // Output is only complete once both pipes hit EOF.
            for pump in self.pumps.drain(..) {
                if let Err(e) = pump.await {
                    warn!(error = %e, "output pump task failed");
                }
            }
            Ok(status.code().unwrap_or(-1))
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            #[cfg(unix)]
            {
                if let Some(pid) = self.child.id() {
                    kill_process_group(pid);
                }
            }
            let result = self.child.kill().await;
            for pump in self.pumps.drain(..) {
                pump.abort();
            }
            result
        })
    }
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid, error = %e, "failed to kill process group"),
    }
}
