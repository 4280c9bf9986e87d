// src/projects.rs

//! Where selectable projects come from, and how a selection is checked
//! before it is saved into a job.

use std::fmt;

/// Returns the projects a user may pick, in display order.
pub trait ProjectListingSource: Send + Sync {
    fn list_projects(&self) -> Vec<String>;
}

/// Projects offered when a job file does not list any.
pub const DEFAULT_PROJECTS: [&str; 2] = ["project1", "project2"];

/// A fixed list of projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticProjectListing {
    projects: Vec<String>,
}

impl StaticProjectListing {
    pub fn new(projects: Vec<String>) -> Self {
        Self { projects }
    }

    pub fn contains(&self, project: &str) -> bool {
        self.projects.iter().any(|p| p == project)
    }
}

impl Default for StaticProjectListing {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECTS.iter().map(|p| p.to_string()).collect())
    }
}

impl ProjectListingSource for StaticProjectListing {
    fn list_projects(&self) -> Vec<String> {
        self.projects.clone()
    }
}

/// Outcome of checking a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValidation {
    Ok,
    Error(String),
}

impl FormValidation {
    pub fn is_ok(&self) -> bool {
        matches!(self, FormValidation::Ok)
    }
}

impl fmt::Display for FormValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormValidation::Ok => f.write_str("ok"),
            FormValidation::Error(msg) => f.write_str(msg),
        }
    }
}

/// Check the `project` field of a job configuration.
pub fn check_project(project: &str) -> FormValidation {
    if project.trim().is_empty() {
        return FormValidation::Error("Select a project.".to_string());
    }
    FormValidation::Ok
}
