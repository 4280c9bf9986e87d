// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod projects;
pub mod step;
pub mod types;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, NodeSection};
use crate::errors::{ProjectStepError, Result};
use crate::exec::{CancellationToken, ExecutionChannel, LocalChannel, SshChannel};
use crate::projects::{FormValidation, ProjectListingSource, check_project};
use crate::step::{BuildStep, PlaceholderCommand};
use crate::types::{NodeKind, ProjectSelection};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - job file loading
/// - project listing / selection
/// - the execution channel for the configured node
/// - the build step itself
/// - Ctrl-C handling (aborts the running command)
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)?;

    if args.list_projects {
        print_projects(&cfg, &mut std::io::stdout())?;
        return Ok(());
    }

    let project = selected_project(&cfg, args.project.as_deref())?;
    let workspace = args
        .workspace
        .clone()
        .unwrap_or_else(|| cfg.step.effective_workspace(&config_root_dir(&config_path)));

    if args.dry_run {
        print_dry_run(&cfg, &project, &workspace, &mut std::io::stdout())?;
        return Ok(());
    }

    let channel = channel_for(&cfg.node);

    // Ctrl-C → abort the job.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; aborting build step");
            cancel.cancel();
        });
    }

    info!(
        project = %project,
        node = %channel.node_name(),
        workspace = %workspace.display(),
        "running build step"
    );

    let mut log = std::io::stdout();
    build_step(&cfg)
        .run(&project, &workspace, channel.as_ref(), &mut log, &cancel)
        .await?;

    Ok(())
}

/// Construct the build step a job file describes.
pub fn build_step(cfg: &ConfigFile) -> BuildStep {
    BuildStep::with_resolver(Arc::new(PlaceholderCommand::new(
        cfg.step.effective_command(),
    )))
    .environment(cfg.step.env.clone())
    .inherit_env(cfg.step.inherit_env)
}

/// Construct the execution channel for a `[node]` section.
pub fn channel_for(node: &NodeSection) -> Box<dyn ExecutionChannel> {
    match node.kind {
        NodeKind::Local => match &node.name {
            Some(name) => Box::new(LocalChannel::named(name.clone())),
            None => Box::new(LocalChannel::new()),
        },
        NodeKind::Ssh => {
            // Validation guarantees a host for ssh nodes.
            let mut channel = SshChannel::new(node.host.clone().unwrap_or_default());
            if let Some(user) = &node.user {
                channel = channel.with_user(user.clone());
            }
            if let Some(port) = node.port {
                channel = channel.with_port(port);
            }
            Box::new(channel)
        }
    }
}

/// The project to build: the CLI override if given, else the job file's.
///
/// A non-blank override must be one of the listed projects (when any are
/// listed). A blank selection is passed through so the step can report it.
pub fn selected_project(cfg: &ConfigFile, cli_override: Option<&str>) -> Result<ProjectSelection> {
    let Some(name) = cli_override else {
        return Ok(cfg.step.project.clone());
    };

    if let FormValidation::Error(msg) = check_project(name) {
        debug!(%msg, "blank --project override");
        return Ok(ProjectSelection::new(name));
    }

    let listing = cfg.projects.listing();
    let available = listing.list_projects();
    if !available.is_empty() && !listing.contains(name) {
        return Err(ProjectStepError::ConfigError(format!(
            "--project '{name}' is not one of the available projects {available:?}"
        )));
    }
    Ok(ProjectSelection::new(name))
}

/// Figure out the directory relative workspaces are resolved against.
///
/// - If the job file path has a non-empty parent, that directory.
/// - For a bare filename, the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// One project per line; the selected one is marked with `*`.
pub fn print_projects(cfg: &ConfigFile, out: &mut dyn Write) -> std::io::Result<()> {
    for project in cfg.projects.listing().list_projects() {
        let marker = if project == cfg.step.project.as_str() {
            "*"
        } else {
            " "
        };
        writeln!(out, "{marker} {project}")?;
    }
    Ok(())
}

/// Show what a run would do without launching anything.
pub fn print_dry_run(
    cfg: &ConfigFile,
    project: &ProjectSelection,
    workspace: &Path,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    writeln!(out, "projectstep dry-run")?;
    writeln!(out, "  project: {}", display_project(project))?;
    writeln!(out, "  command: {}", cfg.step.effective_command())?;
    writeln!(out, "  workspace: {}", workspace.display())?;
    writeln!(out, "  node: {}", channel_for(&cfg.node).node_name())?;
    writeln!(out, "  inherit_env: {}", cfg.step.inherit_env)?;
    for (key, value) in cfg.step.env.iter() {
        writeln!(out, "  env: {key}={value}")?;
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn display_project(project: &ProjectSelection) -> &str {
    if project.is_blank() {
        "<none selected>"
    } else {
        project.as_str()
    }
}
