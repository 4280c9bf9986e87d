// src/exec/channel.rs

//! Pluggable execution channel abstraction.
//!
//! The executor never spawns processes itself. It hands a [`LaunchRequest`]
//! to an `ExecutionChannel`, which decides *where* the process runs:
//!
//! - [`LocalChannel`](super::local::LocalChannel) spawns on this machine.
//! - [`SshChannel`](super::ssh::SshChannel) runs the command on a remote
//!   agent through the `ssh` client.
//! - Tests can provide their own channel that never starts a real process.

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::errors::ExecError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything a channel needs to start one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Program followed by its arguments; never empty.
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub inherit_env: bool,
}

impl LaunchRequest {
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

/// Shared byte buffer that both stdout and stderr are appended to.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, chunk: &[u8]) {
        let mut guard = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        guard.extend_from_slice(chunk);
    }

    /// Take everything captured so far, leaving the buffer empty.
    pub fn take(&self) -> Vec<u8> {
        let mut guard = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A started process, wherever it runs.
pub trait ProcessHandle: Send {
    /// OS process id of the launched process (on the node that launched it),
    /// if known.
    fn id(&self) -> Option<u32>;

    /// Wait for the process to exit and for all of its output to reach the
    /// [`OutputBuffer`]. Returns the exit code; `-1` if killed by a signal.
    fn join(&mut self) -> BoxFuture<'_, io::Result<i32>>;

    /// Terminate the process and reap it.
    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>>;
}

/// Capability to start processes on one execution node.
pub trait ExecutionChannel: Send + Sync {
    /// Human-readable node name used in logs and errors.
    fn node_name(&self) -> &str;

    /// Start the process described by `request`, wiring both of its output
    /// streams into `output`.
    fn launch(
        &self,
        request: LaunchRequest,
        output: OutputBuffer,
    ) -> BoxFuture<'_, Result<Box<dyn ProcessHandle>, ExecError>>;
}
