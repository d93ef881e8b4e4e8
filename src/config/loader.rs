// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{LaunchFile, RawLaunchFile};
use crate::errors::Result;

/// Load a launch file from a given path and return the raw
/// `RawLaunchFile`.
///
/// This only performs TOML deserialization; it does **not** perform
/// semantic validation (program sanity, supervisor timing, env names).
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawLaunchFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawLaunchFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a launch file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - an empty program path,
///   - nonsensical supervisor timing (zero tick, tick > window),
///   - malformed environment variable names.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<LaunchFile> {
    let raw = load_from_path(&path)?;
    let config = LaunchFile::try_from(raw)?;
    Ok(config)
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `Spawnwatch.toml` in the current working
/// directory, but this function exists so you can later:
///
/// - Respect an env var (e.g. `SPAWNWATCH_CONFIG`).
/// - Look for multiple default locations.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Spawnwatch.toml")
}
