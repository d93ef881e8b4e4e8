// src/launch/spawn.rs

//! Fork the child and wire it to the output channel.

use std::path::PathBuf;

use nix::errno::Errno;
use nix::libc;
use nix::unistd::{fork, ForkResult, Pid};
use tracing::{debug, info};

use crate::errors::{Result, SpawnwatchError};
use crate::launch::channel::{OutputChannel, OutputReader};
use crate::launch::exec::{report_exec_failure, PreparedExec, EXEC_FAILURE_STATUS};

/// Everything needed to launch one child process.
///
/// Arguments are an exact argv vector — no shell is ever involved, and
/// no expansion is applied to any element. `argv[0]` is always the
/// program path itself.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Path to the executable. Must resolve to a regular file at fork
    /// time; a dangling path surfaces as an exec failure, not an error
    /// from request construction.
    pub program: PathBuf,

    /// Arguments after `argv[0]`, passed verbatim.
    pub args: Vec<String>,

    /// What environment the child sees.
    pub env: EnvSpec,
}

/// Environment handed to the child.
#[derive(Debug, Clone)]
pub enum EnvSpec {
    /// Inherit the parent environment, with overrides applied on top.
    Inherit { overrides: Vec<(String, String)> },
    /// Exactly these variables, nothing inherited.
    Explicit(Vec<(String, String)>),
}

impl Default for EnvSpec {
    fn default() -> Self {
        EnvSpec::Inherit { overrides: Vec::new() }
    }
}

impl LaunchRequest {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: EnvSpec::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env_spec(mut self, env: EnvSpec) -> Self {
        self.env = env;
        self
    }
}

/// A freshly forked child, before startup supervision has decided
/// whether it counts as running.
pub struct SpawnedChild {
    pub(crate) pid: Pid,
    pub(crate) output: OutputReader,
    pub(crate) program: String,
}

impl SpawnedChild {
    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }
}

/// Create the output channel, fork, and exec the request in the child.
///
/// The child branch closes the channel's read end, duplicates the write
/// end onto stdout and stderr, closes the now-redundant write end, and
/// runs the exec strategy; on terminal exec failure it reports the OS
/// error on its (redirected) stderr and exits with
/// [`EXEC_FAILURE_STATUS`]. Nothing in the child branch touches the
/// heap — all exec data is prepared here, before the fork.
///
/// The parent branch closes the write end and returns the read end
/// together with the child's pid. On fork failure both pipe ends are
/// closed and no child exists.
pub fn spawn(request: &LaunchRequest) -> Result<SpawnedChild> {
    let program = request.program.display().to_string();

    let prepared = PreparedExec::prepare(request)?;
    let channel = OutputChannel::create()?;
    let (read_raw, write_raw) = channel.raw_ends();

    debug!(program = %program, args = ?request.args, "launching child");

    // SAFETY: the child branch only performs async-signal-safe calls
    // (close/dup2/exec/_exit) on data prepared before the fork.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            unsafe {
                libc::close(read_raw);
            }
            if unsafe { libc::dup2(write_raw, libc::STDOUT_FILENO) } < 0 {
                unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
            }
            if unsafe { libc::dup2(write_raw, libc::STDERR_FILENO) } < 0 {
                unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
            }
            unsafe {
                libc::close(write_raw);
            }

            let errno = prepared.exec();
            report_exec_failure(errno);
            unsafe { libc::_exit(EXEC_FAILURE_STATUS) }
        }
        Ok(ForkResult::Parent { child }) => {
            let output = channel.into_reader();
            info!(pid = child.as_raw(), program = %program, "child forked");
            Ok(SpawnedChild {
                pid: child,
                output,
                program,
            })
        }
        Err(errno @ (Errno::EAGAIN | Errno::ENOMEM)) => Err(
            SpawnwatchError::ResourceExhausted(format!("fork: {errno}")),
        ),
        Err(errno) => Err(SpawnwatchError::SysError(errno)),
    }
}
