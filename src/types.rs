use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// A command to run, where to run it, and with which environment.
///
/// Immutable once constructed: the builder methods consume `self`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    command_line: String,
    working_directory: PathBuf,
    environment: BTreeMap<String, String>,
    inherit_env: bool,
}

impl CommandSpec {
    pub fn new(command_line: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            command_line: command_line.into(),
            working_directory: working_directory.into(),
            environment: BTreeMap::new(),
            inherit_env: true,
        }
    }

    /// Add a single environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Add several environment variables; later values win.
    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.environment.insert(k.into(), v.into());
        }
        self
    }

    /// If false, the child does not see the host environment at all.
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn inherits_env(&self) -> bool {
        self.inherit_env
    }
}

/// Exit status and merged stdout/stderr of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub combined_output: Vec<u8>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output decoded for display; invalid UTF-8 is replaced.
    pub fn output_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.combined_output)
    }
}

/// The project a user picked for a build step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ProjectSelection(String);

impl ProjectSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace-only selections count as "nothing selected".
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProjectSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectSelection {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProjectSelection {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where a build step's command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// This machine.
    Local,
    /// A remote agent reached through the `ssh` client.
    Ssh,
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Local
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(NodeKind::Local),
            "ssh" => Ok(NodeKind::Ssh),
            other => Err(format!(
                "invalid node kind: {other} (expected \"local\" or \"ssh\")"
            )),
        }
    }
}
