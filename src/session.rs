// src/session.rs

//! The host-facing process-control surface.
//!
//! A [`Session`] owns at most one current child and exposes the four
//! operations a host environment drives: `start`, `read_output`,
//! `is_alive`, `stop`. It replaces the "one global pid, one global
//! descriptor" coupling with an explicit, singly-owned value — several
//! sessions can coexist, each supervising its own child.
//!
//! Operations on a session with no current process (never started, or
//! already stopped) are benign no-ops / empty results, never hard
//! failures: callers may legitimately keep polling after teardown.

use std::sync::Arc;

use tracing::warn;

use crate::errors::Result;
use crate::launch::spawn::{spawn, LaunchRequest};
use crate::sink::LogSink;
use crate::supervise::handle::{ProcessHandle, ProcessState};
use crate::supervise::startup::{supervise_startup, StartupPolicy};

pub struct Session {
    sink: Arc<dyn LogSink>,
    policy: StartupPolicy,
    current: Option<ProcessHandle>,
}

impl Session {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self::with_policy(sink, StartupPolicy::default())
    }

    pub fn with_policy(sink: Arc<dyn LogSink>, policy: StartupPolicy) -> Self {
        Self {
            sink,
            policy,
            current: None,
        }
    }

    /// Launch the request and supervise its startup, synchronously.
    ///
    /// On success the session holds a handle in state `Running`. If a
    /// child from a previous `start` is still alive, the call is a
    /// no-op — stop it first.
    pub fn start(&mut self, request: &LaunchRequest) -> Result<()> {
        if let Some(handle) = self.current.as_mut() {
            if handle.is_alive() {
                warn!(
                    pid = handle.pid(),
                    "a child is already running; ignoring start"
                );
                return Ok(());
            }
        }

        let spawned = spawn(request)?;
        let handle = supervise_startup(spawned, &self.policy, self.sink.as_ref())?;
        self.current = Some(handle);
        Ok(())
    }

    /// Drain available child output. Never blocks; empty when there is
    /// nothing buffered or no current process.
    pub fn read_output(&mut self) -> Vec<u8> {
        match self.current.as_mut() {
            Some(handle) => handle.read_output(),
            None => Vec::new(),
        }
    }

    /// Non-blocking liveness check; advances the handle's reap state as
    /// a side effect. `false` when no current process.
    pub fn is_alive(&mut self) -> bool {
        match self.current.as_mut() {
            Some(handle) => handle.is_alive(),
            None => false,
        }
    }

    /// Gracefully stop the current child, if any. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.current.as_mut() {
            handle.stop();
        }
    }

    pub fn pid(&self) -> Option<i32> {
        self.current.as_ref().and_then(ProcessHandle::pid)
    }

    pub fn state(&self) -> Option<ProcessState> {
        self.current.as_ref().map(ProcessHandle::state)
    }
}
