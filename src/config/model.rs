// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::projects::{DEFAULT_PROJECTS, StaticProjectListing};
use crate::step::PLACEHOLDER_COMMAND;
use crate::types::{NodeKind, ProjectSelection};

/// A job file exactly as deserialized, before validation.
///
/// ```toml
/// [step]
/// project = "project1"
/// command = "echo test"
/// workspace = "."
///
/// [step.env]
/// GREETING = "hello"
///
/// [node]
/// kind = "ssh"
/// host = "agent-1"
///
/// [projects]
/// available = ["project1", "project2"]
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub step: StepSection,

    #[serde(default)]
    pub node: NodeSection,

    #[serde(default)]
    pub projects: ProjectsSection,
}

/// `[step]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StepSection {
    /// Selected project. May be blank in the file; running the step then
    /// fails with a configuration error.
    #[serde(default)]
    pub project: ProjectSelection,

    /// Command line to run; defaults to the placeholder command.
    #[serde(default)]
    pub command: Option<String>,

    /// Working directory. Relative paths are resolved against the job
    /// file's directory; if absent, the job file's directory is used.
    #[serde(default)]
    pub workspace: Option<PathBuf>,

    /// Merge `env` over the host environment (`true`) or replace it.
    #[serde(default = "default_inherit_env")]
    pub inherit_env: bool,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_inherit_env() -> bool {
    true
}

impl Default for StepSection {
    fn default() -> Self {
        Self {
            project: ProjectSelection::default(),
            command: None,
            workspace: None,
            inherit_env: default_inherit_env(),
            env: BTreeMap::new(),
        }
    }
}

impl StepSection {
    pub fn effective_command(&self) -> &str {
        self.command.as_deref().unwrap_or(PLACEHOLDER_COMMAND)
    }

    /// Resolve the workspace against the directory holding the job file.
    pub fn effective_workspace(&self, base_dir: &Path) -> PathBuf {
        match &self.workspace {
            Some(ws) if ws.is_absolute() => ws.clone(),
            Some(ws) => base_dir.join(ws),
            None => base_dir.to_path_buf(),
        }
    }
}

/// `[node]` section: where the command runs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeSection {
    #[serde(default)]
    pub kind: NodeKind,

    /// Display name of a local node (defaults to `local`).
    #[serde(default)]
    pub name: Option<String>,

    /// Required for `kind = "ssh"`.
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

/// `[projects]` section: what the project list offers.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsSection {
    #[serde(default = "default_available")]
    pub available: Vec<String>,
}

fn default_available() -> Vec<String> {
    DEFAULT_PROJECTS.iter().map(|p| p.to_string()).collect()
}

impl Default for ProjectsSection {
    fn default() -> Self {
        Self {
            available: default_available(),
        }
    }
}

impl ProjectsSection {
    pub fn listing(&self) -> StaticProjectListing {
        StaticProjectListing::new(self.available.clone())
    }
}

/// A validated job file. Only obtainable through `TryFrom<RawConfigFile>`
/// (see `validate.rs`) or the loader.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub step: StepSection,
    pub node: NodeSection,
    pub projects: ProjectsSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        step: StepSection,
        node: NodeSection,
        projects: ProjectsSection,
    ) -> Self {
        Self {
            step,
            node,
            projects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let raw: RawConfigFile = toml::from_str("").expect("parse");
        assert!(raw.step.project.is_blank());
        assert_eq!(raw.step.effective_command(), "echo test");
        assert!(raw.step.inherit_env);
        assert_eq!(raw.node.kind, NodeKind::Local);
        assert_eq!(raw.projects.available, vec!["project1", "project2"]);
    }

    #[test]
    fn parses_full_file() {
        let raw: RawConfigFile = toml::from_str(
            r#"
[step]
project = "project2"
command = "sh -c 'exit 7'"
workspace = "ws"
inherit_env = false

[step.env]
GREETING = "hello"

[node]
kind = "ssh"
host = "agent-1"
user = "builder"
port = 2222

[projects]
available = ["project2"]
"#,
        )
        .expect("parse");

        assert_eq!(raw.step.project.as_str(), "project2");
        assert_eq!(raw.step.effective_command(), "sh -c 'exit 7'");
        assert!(!raw.step.inherit_env);
        assert_eq!(raw.step.env.get("GREETING").map(String::as_str), Some("hello"));
        assert_eq!(raw.node.kind, NodeKind::Ssh);
        assert_eq!(raw.node.port, Some(2222));
        assert_eq!(raw.projects.available, vec!["project2"]);
    }

    #[cfg(unix)]
    #[test]
    fn workspace_resolution() {
        let base = Path::new("/jobs/a");
        let mut step = StepSection::default();
        assert_eq!(step.effective_workspace(base), PathBuf::from("/jobs/a"));

        step.workspace = Some(PathBuf::from("ws"));
        assert_eq!(step.effective_workspace(base), PathBuf::from("/jobs/a/ws"));

        step.workspace = Some(PathBuf::from("/tmp/ws"));
        assert_eq!(step.effective_workspace(base), PathBuf::from("/tmp/ws"));
    }

    #[test]
    fn unknown_node_kind_is_a_parse_error() {
        let err = toml::from_str::<RawConfigFile>("[node]\nkind = \"docker\"\n");
        assert!(err.is_err());
    }
}
