use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use projectstep::errors::ExecError;
use projectstep::exec::{
    BoxFuture, ExecutionChannel, LaunchRequest, LocalChannel, OutputBuffer, ProcessHandle,
};

/// What a [`FakeChannel`] process does once launched.
#[derive(Debug, Clone)]
pub enum Script {
    /// Print `output` and exit with `code`.
    Exit { code: i32, output: Vec<u8> },
    /// Refuse to launch with an I/O error of this kind.
    FailLaunch(io::ErrorKind),
    /// Never exit on its own; only `kill` ends it.
    Hang,
}

impl Script {
    pub fn exit(code: i32, output: &str) -> Self {
        Script::Exit {
            code,
            output: output.as_bytes().to_vec(),
        }
    }
}

/// A channel that never starts a real process:
/// - records every launch request
/// - plays back a fixed [`Script`]
/// - counts kills
pub struct FakeChannel {
    script: Script,
    launches: Arc<Mutex<Vec<LaunchRequest>>>,
    kills: Arc<AtomicUsize>,
}

impl FakeChannel {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            launches: Arc::new(Mutex::new(Vec::new())),
            kills: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.launches.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

impl ExecutionChannel for FakeChannel {
    fn node_name(&self) -> &str {
        "fake"
    }

    fn launch(
        &self,
        request: LaunchRequest,
        output: OutputBuffer,
    ) -> BoxFuture<'_, Result<Box<dyn ProcessHandle>, ExecError>> {
        Box::pin(async move {
            let program = request.program().to_string();
            self.launches.lock().unwrap().push(request);

            if let Script::FailLaunch(kind) = &self.script {
                return Err(ExecError::Launch {
                    program,
                    node: "fake".to_string(),
                    source: io::Error::new(*kind, "scripted launch failure"),
                });
            }

            Ok(Box::new(FakeProcess {
                script: self.script.clone(),
                output,
                kills: Arc::clone(&self.kills),
            }) as Box<dyn ProcessHandle>)
        })
    }
}

struct FakeProcess {
    script: Script,
    output: OutputBuffer,
    kills: Arc<AtomicUsize>,
}

impl ProcessHandle for FakeProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    fn join(&mut self) -> BoxFuture<'_, io::Result<i32>> {
        Box::pin(async move {
            match &self.script {
                Script::Exit { code, output } => {
                    self.output.append(output);
                    Ok(*code)
                }
                Script::Hang => std::future::pending().await,
                Script::FailLaunch(_) => Err(io::Error::other("not launched")),
            }
        })
    }

    fn kill(&mut self) -> BoxFuture<'_, io::Result<()>> {
        Box::pin(async move {
            self.kills.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// A real [`LocalChannel`] that also remembers the PID of every process it
/// started, so tests can check that processes are gone afterwards.
#[derive(Default)]
pub struct RecordingChannel {
    inner: LocalChannel,
    pids: Arc<Mutex<Vec<u32>>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pids(&self) -> Vec<u32> {
        self.pids.lock().unwrap().clone()
    }
}

impl ExecutionChannel for RecordingChannel {
    fn node_name(&self) -> &str {
        self.inner.node_name()
    }

    fn launch(
        &self,
        request: LaunchRequest,
        output: OutputBuffer,
    ) -> BoxFuture<'_, Result<Box<dyn ProcessHandle>, ExecError>> {
        Box::pin(async move {
            let handle = self.inner.launch(request, output).await?;
            if let Some(pid) = handle.id() {
                self.pids.lock().unwrap().push(pid);
            }
            Ok(handle)
        })
    }
}

/// True while a process with this PID exists (Linux only; elsewhere assumes
/// it is gone).
pub fn process_exists(pid: u32) -> bool {
    if cfg!(target_os = "linux") {
        std::path::Path::new(&format!("/proc/{pid}")).exists()
    } else {
        false
    }
}

/// PIDs of live (non-zombie) processes whose process group is `pgid`.
/// Linux only; elsewhere always empty.
pub fn live_group_members(pgid: u32) -> Vec<u32> {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter(|pid| {
            let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
                return false;
            };
            // Fields after the parenthesised command name: state ppid pgrp ...
            let Some((_, rest)) = stat.rsplit_once(')') else {
                return false;
            };
            let fields: Vec<&str> = rest.split_whitespace().collect();
            fields.len() > 2 && fields[0] != "Z" && fields[2] == pgid.to_string()
        })
        .collect()
}
