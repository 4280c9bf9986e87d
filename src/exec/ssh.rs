// src/exec/ssh.rs

//! Channel that runs commands on a remote agent through the OpenSSH client.
//!
//! The `ssh` client itself is spawned locally; the remote side receives a
//! single POSIX shell script of the form
//!
//! ```text
//! cd '<cwd>' && exec env [-i] K=V ... '<program>' '<arg>' ...
//! ```
//!
//! with every word single-quoted, so the remote shell performs no expansion
//! of the user's words.
//!
//! The client runs with `-tt`, so the remote command gets a pseudo-terminal.
//! Killing the handle kills the local `ssh` client; sshd then closes the pty
//! and the remote command receives SIGHUP. A command that ignores SIGHUP
//! keeps running on the agent. Through the pty, stdout and stderr arrive
//! already interleaved and line endings come back as `\r\n`.

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::ExecError;

use super::channel::{BoxFuture, ExecutionChannel, LaunchRequest, OutputBuffer, ProcessHandle};
use super::local::spawn_local;
use super::tokenize::shell_quote;

#[derive(Debug, Clone)]
pub struct SshChannel {
    host: String,
    user: Option<String>,
    port: Option<u16>,
    ssh_program: String,
    node: String,
}

impl SshChannel {
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            node: format!("ssh:{host}"),
            host,
            user: None,
            port: None,
            ssh_program: "ssh".to_string(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        let user = user.into();
        self.node = format!("ssh:{}@{}", user, self.host);
        self.user = Some(user);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Use a different client binary (a wrapper script, or a fake in tests).
    pub fn with_ssh_program(mut self, program: impl Into<String>) -> Self {
        self.ssh_program = program.into();
        self
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }

    /// Full local argv: the `ssh` invocation carrying the remote script.
    pub fn client_argv(&self, request: &LaunchRequest) -> Vec<String> {
        let mut argv = vec![
            self.ssh_program.clone(),
            "-tt".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if let Some(port) = self.port {
            argv.push("-p".to_string());
            argv.push(port.to_string());
        }
        argv.push(self.destination());
        argv.push("--".to_string());
        argv.push(remote_script(request));
        argv
    }
}

/// The remote script hands the program to `env`, which would read a name
/// containing `=` as an assignment and a leading `-` as an option.
fn check_remote_program(program: &str) -> Result<(), ExecError> {
    if program.contains('=') || program.starts_with('-') {
        return Err(ExecError::InvalidCommandLine(format!(
            "program name '{program}' cannot be run on a remote node"
        )));
    }
    Ok(())
}

/// Build the shell script executed on the remote node.
pub fn remote_script(request: &LaunchRequest) -> String {
    let mut words = vec![
        "cd".to_string(),
        shell_quote(&request.cwd.to_string_lossy()),
        "&&".to_string(),
        "exec".to_string(),
        "env".to_string(),
    ];
    if !request.inherit_env {
        words.push("-i".to_string());
    }
    words.extend(
        request
            .env
            .iter()
            .map(|(k, v)| shell_quote(&format!("{k}={v}"))),
    );
    words.extend(request.argv.iter().map(|a| shell_quote(a)));
    words.join(" ")
}

impl ExecutionChannel for SshChannel {
    fn node_name(&self) -> &str {
        &self.node
    }

    fn launch(
        &self,
        request: LaunchRequest,
        output: OutputBuffer,
    ) -> BoxFuture<'_, Result<Box<dyn ProcessHandle>, ExecError>> {
        Box::pin(async move {
            check_remote_program(request.program())?;
            let argv = self.client_argv(&request);
            debug!(node = %self.node, program = %request.program(), "launching over ssh");

            // The remote side gets its environment from the script; the local
            // client keeps ours (SSH_AUTH_SOCK, etc.).
            let process = spawn_local(&argv, None, &BTreeMap::new(), true, output).map_err(
                |source| ExecError::Launch {
                    program: request.program().to_string(),
                    node: self.node.clone(),
                    source,
                },
            )?;
            Ok(Box::new(process) as Box<dyn ProcessHandle>)
        })
    }
}
