// src/launch/channel.rs

//! Pipe-based output channel between parent and child.
//!
//! The channel owns both descriptors from creation until the fork, then
//! splits: the child consumes the write end (after dup2'ing it onto its
//! standard streams) and the parent consumes the read end. Each end is
//! closed exactly once — in the parent that is enforced by `OwnedFd`
//! ownership, in the child by the raw close calls in the fork branch.

use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::time::Duration;

use nix::errno::Errno;
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags};
use tracing::trace;

use crate::errors::{Result, SpawnwatchError};

/// How much we pull out of the pipe per read call.
const READ_CHUNK: usize = 4096;

/// A connected pipe pair, prior to the fork.
pub(crate) struct OutputChannel {
    read: OwnedFd,
    write: OwnedFd,
}

impl OutputChannel {
    /// Allocate the pipe. Descriptor-table exhaustion is reported as
    /// [`SpawnwatchError::ResourceExhausted`]; anything else is passed
    /// through as the raw OS error.
    pub(crate) fn create() -> Result<Self> {
        match nix::unistd::pipe() {
            Ok((read, write)) => Ok(Self { read, write }),
            Err(errno @ (Errno::EMFILE | Errno::ENFILE)) => Err(
                SpawnwatchError::ResourceExhausted(format!("pipe: {errno}")),
            ),
            Err(errno) => Err(SpawnwatchError::SysError(errno)),
        }
    }

    /// Raw `(read, write)` descriptors for the child branch of the fork,
    /// which must not touch the owned wrappers.
    pub(crate) fn raw_ends(&self) -> (RawFd, RawFd) {
        (self.read.as_raw_fd(), self.write.as_raw_fd())
    }

    /// Parent branch: close the write end and keep the read end.
    pub(crate) fn into_reader(self) -> OutputReader {
        let Self { read, write } = self;
        drop(write);
        OutputReader { fd: read }
    }
}

/// Outcome of a single non-suspending read on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One chunk of buffered output, in the order the child wrote it.
    Data(Vec<u8>),
    /// Nothing available right now (the peer may still write more).
    Empty,
    /// The write end is closed and the pipe is drained.
    Closed,
}

/// The parent's read end of the output channel.
pub struct OutputReader {
    fd: OwnedFd,
}

impl OutputReader {
    /// Switch the read end to non-blocking mode. Reads that would
    /// suspend return [`ReadOutcome::Empty`] instead from here on.
    pub fn set_nonblocking(&self) -> Result<()> {
        let fd = self.fd.as_raw_fd();
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags == -1 {
            return Err(Errno::last().into());
        }
        let res = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if res == -1 {
            return Err(Errno::last().into());
        }
        Ok(())
    }

    /// Wait up to `timeout` for the channel to become readable.
    ///
    /// Hangup and error conditions count as readable so the caller gets
    /// to observe end-of-stream through a read.
    pub fn poll_readable(&self, timeout: Duration) -> Result<bool> {
        let mut fds = [PollFd::new(self.fd.as_fd(), PollFlags::POLLIN)];
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);

        let ready = match poll(&mut fds, millis) {
            Ok(n) => n,
            Err(Errno::EINTR) => 0,
            Err(errno) => return Err(errno.into()),
        };
        if ready == 0 {
            return Ok(false);
        }

        let revents = fds[0].revents().unwrap_or(PollFlags::empty());
        Ok(revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR))
    }

    /// Read whatever is currently buffered, without suspending beyond a
    /// single `read(2)` call.
    pub fn read_available(&self) -> ReadOutcome {
        let mut buf = [0u8; READ_CHUNK];
        let n = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr().cast(),
                buf.len(),
            )
        };
        match n {
            0 => ReadOutcome::Closed,
            n if n > 0 => ReadOutcome::Data(buf[..n as usize].to_vec()),
            _ => match Errno::last() {
                Errno::EAGAIN | Errno::EINTR => ReadOutcome::Empty,
                errno => {
                    trace!(%errno, "read on output channel failed; treating as closed");
                    ReadOutcome::Closed
                }
            },
        }
    }
}
