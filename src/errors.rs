// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::supervise::ExitReason;

#[derive(Error, Debug)]
pub enum SpawnwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("invalid launch request: {0}")]
    InvalidRequest(String),

    /// Pipe or process-table creation failed. Terminal for the launch
    /// attempt; no child exists when this is returned.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Both direct execution and the memory-backed fallback failed. The
    /// child reported the OS error on its output stream and exited with
    /// the reserved status.
    #[error("could not execute '{program}': child exited with the reserved exec-failure status")]
    ExecFailed { program: String },

    /// The child terminated inside the startup window; no live handle
    /// exists for this launch.
    #[error("child exited during startup: {0}")]
    EarlyExit(ExitReason),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("OS error: {0}")]
    SysError(#[from] nix::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SpawnwatchError>;
