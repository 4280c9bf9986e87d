// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`tokenize`] splits a command line into argv (no shell involved).
//! - [`channel`] defines the `ExecutionChannel` capability: *where* a process
//!   runs and how its output is collected.
//! - [`local`] and [`ssh`] are the two channel implementations.
//! - [`executor`] owns the launch / wait / cancel sequence for one command.
//! - [`cancel`] is the job abort signal the executor listens to.

pub mod cancel;
pub mod channel;
pub mod executor;
pub mod local;
pub mod ssh;
pub mod tokenize;

pub use cancel::CancellationToken;
pub use channel::{BoxFuture, ExecutionChannel, LaunchRequest, OutputBuffer, ProcessHandle};
pub use executor::CommandExecutor;
pub use local::LocalChannel;
pub use ssh::SshChannel;
pub use tokenize::tokenize;
