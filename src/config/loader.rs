// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a job file without validating it.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Read a job file and validate it.
///
/// This is the entry point the rest of the crate uses:
///
/// - Reads TOML and applies defaults (`serde` + `Default` impls).
/// - Checks the command line, the node description and the project list.
///
/// A blank `project` is accepted here; running the step reports it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Projectstep.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Projectstep.toml")
}
