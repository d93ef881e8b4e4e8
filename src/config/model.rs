// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::launch::{EnvSpec, LaunchRequest};
use crate::supervise::startup::{StartupPolicy, DEFAULT_STARTUP_WINDOW, DEFAULT_TICK};

/// Top-level launch file as read from TOML:
///
/// ```toml
/// [launch]
/// program = "/opt/relay/bin/relayd"
/// args = ["--data-dir", "/var/lib/relay"]
/// inherit_env = true
///
/// [launch.env]
/// RELAY_LOG = "notice"
///
/// [supervisor]
/// startup_window_ms = 3000
/// tick_ms = 100
/// ```
///
/// The `[supervisor]` section is optional and defaults apply.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLaunchFile {
    /// What to launch, from `[launch]`.
    pub launch: LaunchSection,

    /// Startup supervision knobs from `[supervisor]`.
    #[serde(default)]
    pub supervisor: SupervisorSection,
}

/// `[launch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchSection {
    /// Path to the executable.
    pub program: String,

    /// Arguments after `argv[0]`, passed verbatim (no shell).
    #[serde(default)]
    pub args: Vec<String>,

    /// Whether the child inherits the parent's environment. When true,
    /// `[launch.env]` entries are applied on top; when false they are
    /// the whole environment.
    #[serde(default = "default_inherit_env")]
    pub inherit_env: bool,

    /// Extra / explicit environment variables from `[launch.env]`.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_inherit_env() -> bool {
    true
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
    /// How long the child must survive to count as running.
    #[serde(default = "default_startup_window_ms")]
    pub startup_window_ms: u64,

    /// Poll interval inside the startup window (and for reader loops).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_startup_window_ms() -> u64 {
    DEFAULT_STARTUP_WINDOW.as_millis() as u64
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK.as_millis() as u64
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            startup_window_ms: default_startup_window_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

/// A launch file that has passed validation.
#[derive(Debug, Clone)]
pub struct LaunchFile {
    pub launch: LaunchSection,
    pub supervisor: SupervisorSection,
}

impl LaunchFile {
    /// Construct without re-running validation. Used by
    /// `TryFrom<RawLaunchFile>` after the checks have passed.
    pub(crate) fn new_unchecked(launch: LaunchSection, supervisor: SupervisorSection) -> Self {
        Self { launch, supervisor }
    }

    /// Build the launch request this file describes.
    pub fn to_request(&self) -> LaunchRequest {
        let vars: Vec<(String, String)> = self
            .launch
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let env = if self.launch.inherit_env {
            EnvSpec::Inherit { overrides: vars }
        } else {
            EnvSpec::Explicit(vars)
        };

        LaunchRequest::new(&self.launch.program)
            .args(self.launch.args.clone())
            .env_spec(env)
    }

    /// Build the startup policy this file describes.
    pub fn to_policy(&self) -> StartupPolicy {
        StartupPolicy {
            window: Duration::from_millis(self.supervisor.startup_window_ms),
            tick: Duration::from_millis(self.supervisor.tick_ms),
        }
    }
}
