// src/config/mod.rs

//! Job file loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a job file from disk.
//! - `validate.rs`: turning a raw file into a checked [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, NodeSection, ProjectsSection, RawConfigFile, StepSection};
