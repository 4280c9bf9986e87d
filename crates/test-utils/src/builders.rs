#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use projectstep::config::{ConfigFile, NodeSection, ProjectsSection, RawConfigFile, StepSection};
use projectstep::types::{NodeKind, ProjectSelection};

/// Builder for `ConfigFile` to simplify test setup.
pub struct JobFileBuilder {
    config: RawConfigFile,
}

impl JobFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                step: StepSection::default(),
                node: NodeSection::default(),
                projects: ProjectsSection::default(),
            },
        }
    }

    pub fn project(mut self, name: &str) -> Self {
        self.config.step.project = ProjectSelection::new(name);
        self
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.config.step.command = Some(cmd.to_string());
        self
    }

    pub fn workspace(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.step.workspace = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.step.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn inherit_env(mut self, val: bool) -> Self {
        self.config.step.inherit_env = val;
        self
    }

    pub fn local_node(mut self, name: &str) -> Self {
        self.config.node = NodeSection {
            kind: NodeKind::Local,
            name: Some(name.to_string()),
            ..NodeSection::default()
        };
        self
    }

    pub fn ssh_node(mut self, host: &str) -> Self {
        self.config.node = NodeSection {
            kind: NodeKind::Ssh,
            host: Some(host.to_string()),
            ..NodeSection::default()
        };
        self
    }

    pub fn projects(mut self, names: &[&str]) -> Self {
        self.config.projects.available = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// Render the job file as TOML, for tests that go through the loader.
    pub fn to_toml(&self) -> String {
        let step = &self.config.step;
        let mut out = String::from("[step]\n");
        out.push_str(&format!("project = {}\n", toml_str(step.project.as_str())));
        if let Some(cmd) = &step.command {
            out.push_str(&format!("command = {}\n", toml_str(cmd)));
        }
        if let Some(ws) = &step.workspace {
            out.push_str(&format!("workspace = {}\n", toml_str(&ws.to_string_lossy())));
        }
        out.push_str(&format!("inherit_env = {}\n", step.inherit_env));
        if !step.env.is_empty() {
            out.push_str("\n[step.env]\n");
            for (k, v) in step.env.iter() {
                out.push_str(&format!("{k} = {}\n", toml_str(v)));
            }
        }

        let node = &self.config.node;
        out.push_str("\n[node]\n");
        out.push_str(match node.kind {
            NodeKind::Local => "kind = \"local\"\n",
            NodeKind::Ssh => "kind = \"ssh\"\n",
        });
        let fields: BTreeMap<&str, Option<String>> = BTreeMap::from([
            ("name", node.name.clone()),
            ("host", node.host.clone()),
            ("user", node.user.clone()),
        ]);
        for (key, value) in fields {
            if let Some(value) = value {
                out.push_str(&format!("{key} = {}\n", toml_str(&value)));
            }
        }
        if let Some(port) = node.port {
            out.push_str(&format!("port = {port}\n"));
        }

        out.push_str("\n[projects]\navailable = [");
        let names: Vec<String> = self
            .config
            .projects
            .available
            .iter()
            .map(|p| toml_str(p))
            .collect();
        out.push_str(&names.join(", "));
        out.push_str("]\n");
        out
    }
}

impl Default for JobFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// TOML basic string with escapes.
fn toml_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
