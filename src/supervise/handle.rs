// src/supervise/handle.rs

//! The supervisor-visible state for one running child process.

use std::fmt;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::launch::channel::{OutputReader, ReadOutcome};

/// Why a child stopped. The exit-code and signal cases are distinct and
/// must never be conflated for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Code(i32),
    Signal(Signal),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Code(code) => write!(f, "exit code {code}"),
            ExitReason::Signal(signal) => write!(f, "signal {} ({})", *signal as i32, signal),
        }
    }
}

/// Lifecycle of a launched child as seen from the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Forked, startup window still running.
    Starting,
    /// Survived the startup window.
    Running,
    /// A wait observed termination.
    Exited(ExitReason),
    /// The pid was reaped by someone else; the exit status is lost.
    ReapedExternally,
}

/// One running child: pid, the output channel's read end, and the
/// state machine driven by the liveness check.
///
/// The pid and descriptor are exclusively owned here; the handle
/// assumes a single owner thread.
pub struct ProcessHandle {
    pid: Option<Pid>,
    output: Option<OutputReader>,
    state: ProcessState,
    program: String,
}

impl ProcessHandle {
    /// A handle exists from the moment the fork succeeds; it starts in
    /// `Starting` and is promoted by [`finish_startup`].
    ///
    /// [`finish_startup`]: ProcessHandle::finish_startup
    pub(crate) fn starting(pid: Pid, output: OutputReader, program: String) -> Self {
        Self {
            pid: Some(pid),
            output: Some(output),
            state: ProcessState::Starting,
            program,
        }
    }

    /// Bounded wait for channel readability, used by the startup loop.
    pub(crate) fn poll_output(&self, timeout: Duration) -> Result<bool> {
        match &self.output {
            Some(output) => output.poll_readable(timeout),
            None => Ok(false),
        }
    }

    /// Startup window survived: switch the channel to non-blocking mode
    /// and promote the handle to `Running`.
    pub(crate) fn finish_startup(&mut self) -> Result<()> {
        if let Some(output) = &self.output {
            output.set_nonblocking()?;
        }
        self.state = ProcessState::Running;
        Ok(())
    }

    pub fn pid(&self) -> Option<i32> {
        self.pid.map(Pid::as_raw)
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Non-blocking wait on the recorded pid.
    ///
    /// A still-running child yields `true`. Observing termination reaps
    /// the child as a side effect (an exited-but-unreaped child is a
    /// zombie until waited on), records the reason, and invalidates the
    /// pid. The read end stays open so remaining buffered output can
    /// still be drained.
    pub fn is_alive(&mut self) -> bool {
        let Some(pid) = self.pid else {
            return false;
        };

        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(WaitStatus::Exited(_, code)) => {
                debug!(pid = pid.as_raw(), code, "child exited");
                self.state = ProcessState::Exited(ExitReason::Code(code));
                self.pid = None;
                false
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                debug!(pid = pid.as_raw(), %signal, "child killed by signal");
                self.state = ProcessState::Exited(ExitReason::Signal(signal));
                self.pid = None;
                false
            }
            // Stopped/continued under a debugger still counts as alive.
            Ok(_) => true,
            Err(Errno::ECHILD) => {
                warn!(pid = pid.as_raw(), "child already reaped elsewhere");
                self.state = ProcessState::ReapedExternally;
                self.pid = None;
                false
            }
            Err(errno) => {
                warn!(pid = pid.as_raw(), %errno, "waitpid failed");
                false
            }
        }
    }

    /// Drain whatever the channel has buffered right now.
    ///
    /// Never blocks once the handle is `Running` (the channel is in
    /// non-blocking mode by then) and never fails: after the child has
    /// exited and the pipe is drained this returns an empty vector
    /// indefinitely.
    pub fn read_output(&mut self) -> Vec<u8> {
        let Some(output) = self.output.as_ref() else {
            return Vec::new();
        };
        match output.read_available() {
            ReadOutcome::Data(bytes) => bytes,
            ReadOutcome::Empty => Vec::new(),
            ReadOutcome::Closed => {
                // End of stream; release the descriptor now.
                self.output = None;
                Vec::new()
            }
        }
    }

    /// Request graceful termination with `SIGTERM` and tear the handle
    /// down: the pid is invalidated (a second `stop` is a no-op) and
    /// the read end is closed.
    ///
    /// Returning does not guarantee the child has exited; it is left to
    /// the OS to deliver the signal. An unreaped child lingers as a
    /// zombie until the parent process exits.
    pub fn stop(&mut self) {
        if let Some(pid) = self.pid.take() {
            debug!(pid = pid.as_raw(), program = %self.program, "stopping child");
            if let Err(errno) = kill(pid, Signal::SIGTERM) {
                debug!(pid = pid.as_raw(), %errno, "failed to signal child");
            }
        }
        self.output = None;
    }
}
