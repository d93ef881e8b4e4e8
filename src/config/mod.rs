// src/config/mod.rs

//! Launch configuration (TOML).
//!
//! - [`model`] holds the raw and validated file models.
//! - [`loader`] reads a file from disk.
//! - [`validate`] turns a raw file into a validated [`LaunchFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{LaunchFile, LaunchSection, RawLaunchFile, SupervisorSection};
