// src/config/validate.rs

use std::collections::BTreeSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ProjectStepError, Result};
use crate::exec::tokenize;
use crate::types::NodeKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ProjectStepError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.step, raw.node, raw.projects))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_command(cfg)?;
    validate_node(cfg)?;
    validate_projects(cfg)?;
    validate_selection(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> ProjectStepError {
    ProjectStepError::ConfigError(msg.into())
}

fn validate_command(cfg: &RawConfigFile) -> Result<()> {
    let Some(command) = cfg.step.command.as_deref() else {
        return Ok(());
    };

    let words = tokenize(command)
        .map_err(|e| config_error(format!("[step].command is not usable: {e}")))?;
    if words.is_empty() {
        return Err(config_error("[step].command must not be blank"));
    }
    Ok(())
}

fn validate_node(cfg: &RawConfigFile) -> Result<()> {
    let node = &cfg.node;
    match node.kind {
        NodeKind::Ssh => {
            let host_ok = node.host.as_deref().is_some_and(|h| !h.trim().is_empty());
            if !host_ok {
                return Err(config_error("[node].host is required when kind = \"ssh\""));
            }
            if node.port == Some(0) {
                return Err(config_error("[node].port must be between 1 and 65535"));
            }
        }
        NodeKind::Local => {
            if node.host.is_some() || node.user.is_some() || node.port.is_some() {
                return Err(config_error(
                    "[node].host/user/port are only valid when kind = \"ssh\"",
                ));
            }
        }
    }
    Ok(())
}

fn validate_projects(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = BTreeSet::new();
    for project in cfg.projects.available.iter() {
        if project.trim().is_empty() {
            return Err(config_error("[projects].available contains a blank name"));
        }
        if !seen.insert(project.as_str()) {
            return Err(config_error(format!(
                "[projects].available lists '{project}' more than once"
            )));
        }
    }
    Ok(())
}

fn validate_selection(cfg: &RawConfigFile) -> Result<()> {
    let project = &cfg.step.project;
    if project.is_blank() || cfg.projects.available.is_empty() {
        return Ok(());
    }
    if !cfg.projects.listing().contains(project.as_str()) {
        return Err(config_error(format!(
            "[step].project '{project}' is not one of the available projects {:?}",
            cfg.projects.available
        )));
    }
    Ok(())
}
