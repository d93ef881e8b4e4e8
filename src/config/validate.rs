// src/config/validate.rs

use crate::config::model::{LaunchFile, RawLaunchFile};
use crate::errors::{Result, SpawnwatchError};

impl TryFrom<RawLaunchFile> for LaunchFile {
    type Error = crate::errors::SpawnwatchError;

    fn try_from(raw: RawLaunchFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(LaunchFile::new_unchecked(raw.launch, raw.supervisor))
    }
}

fn validate_raw_config(cfg: &RawLaunchFile) -> Result<()> {
    validate_program(cfg)?;
    validate_supervisor(cfg)?;
    validate_env(cfg)?;
    Ok(())
}

fn validate_program(cfg: &RawLaunchFile) -> Result<()> {
    if cfg.launch.program.trim().is_empty() {
        return Err(SpawnwatchError::ConfigError(
            "[launch].program must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_supervisor(cfg: &RawLaunchFile) -> Result<()> {
    if cfg.supervisor.tick_ms == 0 {
        return Err(SpawnwatchError::ConfigError(
            "[supervisor].tick_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.supervisor.tick_ms > cfg.supervisor.startup_window_ms {
        return Err(SpawnwatchError::ConfigError(format!(
            "[supervisor].tick_ms ({}) must not exceed startup_window_ms ({})",
            cfg.supervisor.tick_ms, cfg.supervisor.startup_window_ms
        )));
    }

    Ok(())
}

fn validate_env(cfg: &RawLaunchFile) -> Result<()> {
    for key in cfg.launch.env.keys() {
        if key.is_empty() {
            return Err(SpawnwatchError::ConfigError(
                "[launch.env] contains an empty variable name".to_string(),
            ));
        }
        if key.contains('=') || key.contains('\0') {
            return Err(SpawnwatchError::ConfigError(format!(
                "[launch.env] variable name '{key}' contains an invalid character"
            )));
        }
    }
    Ok(())
}
