// src/supervise/startup.rs

//! Bounded startup supervision for a freshly forked child.
//!
//! Many launch failures (missing shared library, bad configuration,
//! wrong binary format) show up as a fast exit. Catching them here and
//! reporting them synchronously is far more useful to the caller than
//! handing back a handle that turns out dead on the next poll.
//!
//! No portable event-based child-exit notification exists across our
//! target environments, so this is an explicit tick-based loop: each
//! tick polls the output channel with a short timeout and does a
//! non-blocking wait on the child. The loop is the only place in the
//! crate that blocks, and only ever for one tick at a time.

use std::time::{Duration, Instant};

use nix::errno::Errno;
use tracing::{debug, info};

use crate::errors::{Result, SpawnwatchError};
use crate::launch::exec::EXEC_FAILURE_STATUS;
use crate::launch::spawn::SpawnedChild;
use crate::sink::{LineBuffer, LogSink};
use crate::supervise::handle::{ExitReason, ProcessHandle, ProcessState};

/// Default length of the startup window.
pub const DEFAULT_STARTUP_WINDOW: Duration = Duration::from_millis(3000);

/// Default polling tick inside the window.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Timing knobs for startup supervision.
#[derive(Debug, Clone)]
pub struct StartupPolicy {
    /// How long the child must survive before it counts as running.
    pub window: Duration,
    /// Poll interval: the longest a single loop iteration blocks.
    pub tick: Duration,
}

impl Default for StartupPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_STARTUP_WINDOW,
            tick: DEFAULT_TICK,
        }
    }
}

/// Watch a freshly forked child for the duration of the startup window.
///
/// Each tick drains available output to the sink and checks whether the
/// child has already exited. Two outcomes:
///
/// - The child dies inside the window: remaining output is drained, the
///   read end is closed, and the termination reason comes back as an
///   error — [`SpawnwatchError::ExecFailed`] if the child used the
///   reserved exec-failure status, otherwise
///   [`SpawnwatchError::EarlyExit`] with the exit code or signal.
/// - The window elapses with the child alive: the read end is switched
///   to non-blocking mode and the handle comes back in state `Running`.
pub fn supervise_startup(
    spawned: SpawnedChild,
    policy: &StartupPolicy,
    sink: &dyn LogSink,
) -> Result<ProcessHandle> {
    let SpawnedChild { pid, output, program } = spawned;
    let mut handle = ProcessHandle::starting(pid, output, program);

    let mut lines = LineBuffer::new();
    let started = Instant::now();

    debug!(
        pid = handle.pid(),
        window_ms = policy.window.as_millis() as u64,
        tick_ms = policy.tick.as_millis() as u64,
        "supervising startup"
    );

    while started.elapsed() < policy.window {
        if handle.poll_output(policy.tick)? {
            let chunk = handle.read_output();
            if !chunk.is_empty() {
                lines.push(&chunk, sink);
            }
        }

        if !handle.is_alive() {
            // The channel is still in blocking mode, so gate every read
            // behind a zero-timeout poll: a grandchild holding the write
            // end open must not suspend the drain.
            while handle.poll_output(Duration::ZERO)? {
                let rest = handle.read_output();
                if rest.is_empty() {
                    break;
                }
                lines.push(&rest, sink);
            }
            lines.flush(sink);

            return Err(match handle.state() {
                ProcessState::Exited(reason) => startup_failure(handle.program(), reason),
                // Reaped elsewhere, or the wait itself failed; either
                // way the exit reason is unknowable.
                _ => SpawnwatchError::SysError(Errno::ECHILD),
            });
        }
    }

    // Anything still sitting in the line buffer is forwarded now; from
    // here on the caller drains raw bytes through the handle.
    lines.flush(sink);

    handle.finish_startup()?;
    info!(
        pid = handle.pid(),
        program = %handle.program(),
        "child survived startup window"
    );
    Ok(handle)
}

/// Classify an in-window death: the reserved status means the exec
/// strategy itself failed, anything else is the target's own doing.
fn startup_failure(program: &str, reason: ExitReason) -> SpawnwatchError {
    if reason == ExitReason::Code(EXEC_FAILURE_STATUS) {
        return SpawnwatchError::ExecFailed {
            program: program.to_string(),
        };
    }
    SpawnwatchError::EarlyExit(reason)
}
