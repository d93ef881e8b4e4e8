// src/launch/exec.rs

//! Execution strategy run inside the forked child.
//!
//! The primary attempt is a plain `execve`. If the OS refuses it for a
//! reason that smells like a filesystem restriction rather than a bad
//! binary — `EACCES`, `EPERM`, `ENOEXEC`, `ETXTBSY` — the strategy
//! copies the binary's bytes into an anonymous memory-backed descriptor
//! and executes that descriptor with `fexecve` instead. Execution is
//! then requested against an in-memory object, not the path, which
//! sidesteps no-exec mount restrictions.
//!
//! Everything here past [`PreparedExec::exec`] runs between `fork` and
//! `exec` and must be async-signal-safe: all strings and pointer arrays
//! are prepared in the parent, and the child branch performs no heap
//! allocation. That is why this module speaks raw `libc` where the rest
//! of the crate uses `nix` wrappers.

use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;

use nix::errno::Errno;
use nix::libc;

use crate::errors::{Result, SpawnwatchError};
use crate::launch::spawn::{EnvSpec, LaunchRequest};

/// Reserved exit status for "could not execute the target binary",
/// distinguishable from any exit status of the target itself.
pub const EXEC_FAILURE_STATUS: i32 = 127;

/// Copy buffer for streaming the binary into the memory-backed
/// descriptor. Lives on the child's stack.
const COPY_CHUNK: usize = 8192;

/// An exec call fully prepared in the parent.
///
/// The pointer arrays alias the `CString` heap buffers, which stay put
/// when this struct moves; the fields are never mutated after
/// construction.
pub(crate) struct PreparedExec {
    path: CString,
    _argv: Vec<CString>,
    _envp: Vec<CString>,
    argv_ptrs: Vec<*const libc::c_char>,
    envp_ptrs: Vec<*const libc::c_char>,
}

impl PreparedExec {
    pub(crate) fn prepare(request: &LaunchRequest) -> Result<Self> {
        let path = cstring(request.program.as_os_str().as_bytes())?;

        // argv[0] is always the executable path, per OS convention.
        let mut argv = Vec::with_capacity(request.args.len() + 1);
        argv.push(path.clone());
        for arg in &request.args {
            argv.push(cstring(arg.as_bytes())?);
        }

        let envp = build_envp(&request.env)?;

        let argv_ptrs = null_terminated(&argv);
        let envp_ptrs = null_terminated(&envp);

        Ok(Self {
            path,
            _argv: argv,
            _envp: envp,
            argv_ptrs,
            envp_ptrs,
        })
    }

    /// Replace the process image. Never returns on success; on failure,
    /// returns the errno of the last attempt without unwinding.
    ///
    /// Child-branch only.
    pub(crate) fn exec(&self) -> Errno {
        unsafe {
            libc::execve(
                self.path.as_ptr(),
                self.argv_ptrs.as_ptr(),
                self.envp_ptrs.as_ptr(),
            );
        }

        let errno = Errno::last();
        if is_retryable(errno) {
            return self.exec_from_memory();
        }
        errno
    }

    /// The fallback: stream the binary into a memory-backed descriptor
    /// and execute that. Never returns on success.
    fn exec_from_memory(&self) -> Errno {
        const MEMFD_NAME: &CStr = c"spawnwatch-exec";

        let memfd = unsafe { libc::memfd_create(MEMFD_NAME.as_ptr(), 0) };
        if memfd < 0 {
            return Errno::last();
        }

        let src = unsafe { libc::open(self.path.as_ptr(), libc::O_RDONLY | libc::O_CLOEXEC) };
        if src < 0 {
            let errno = Errno::last();
            unsafe { libc::close(memfd) };
            return errno;
        }

        let mut buf = [0u8; COPY_CHUNK];
        loop {
            let n = unsafe { libc::read(src, buf.as_mut_ptr().cast(), buf.len()) };
            if n == 0 {
                break;
            }
            if n < 0 {
                if Errno::last() == Errno::EINTR {
                    continue;
                }
                let errno = Errno::last();
                unsafe {
                    libc::close(src);
                    libc::close(memfd);
                }
                return errno;
            }
            if let Err(errno) = write_all(memfd, &buf[..n as usize]) {
                unsafe {
                    libc::close(src);
                    libc::close(memfd);
                }
                return errno;
            }
        }
        unsafe { libc::close(src) };

        if unsafe { libc::lseek(memfd, 0, libc::SEEK_SET) } < 0 {
            let errno = Errno::last();
            unsafe { libc::close(memfd) };
            return errno;
        }

        unsafe {
            libc::fexecve(memfd, self.argv_ptrs.as_ptr(), self.envp_ptrs.as_ptr());
        }
        Errno::last()
    }
}

/// The errno class that triggers the memory-backed fallback: the
/// filesystem denied direct execution, the kernel rejected the format
/// through this path, or the binary is mid-write by another process.
fn is_retryable(errno: Errno) -> bool {
    matches!(
        errno,
        Errno::EACCES | Errno::EPERM | Errno::ENOEXEC | Errno::ETXTBSY
    )
}

/// Report a terminal exec failure on the (already redirected) stderr.
///
/// Child-branch only: builds the message in a stack buffer, no heap.
pub(crate) fn report_exec_failure(errno: Errno) {
    let mut buf = [0u8; 128];
    let mut len = 0;

    push_bytes(&mut buf, &mut len, b"spawnwatch: exec failed: errno ");
    push_decimal(&mut buf, &mut len, errno as i32);
    push_bytes(&mut buf, &mut len, b" (");
    push_bytes(&mut buf, &mut len, errno.desc().as_bytes());
    push_bytes(&mut buf, &mut len, b")\n");

    unsafe {
        libc::write(libc::STDERR_FILENO, buf.as_ptr().cast(), len);
    }
}

fn push_bytes(buf: &mut [u8], len: &mut usize, bytes: &[u8]) {
    let n = bytes.len().min(buf.len() - *len);
    buf[*len..*len + n].copy_from_slice(&bytes[..n]);
    *len += n;
}

fn push_decimal(buf: &mut [u8], len: &mut usize, value: i32) {
    let mut digits = [0u8; 12];
    let mut n = digits.len();
    let mut rest = value.unsigned_abs();
    loop {
        n -= 1;
        digits[n] = b'0' + (rest % 10) as u8;
        rest /= 10;
        if rest == 0 {
            break;
        }
    }
    if value < 0 {
        push_bytes(buf, len, b"-");
    }
    push_bytes(buf, len, &digits[n..]);
}

fn write_all(fd: libc::c_int, mut bytes: &[u8]) -> std::result::Result<(), Errno> {
    while !bytes.is_empty() {
        let n = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if n < 0 {
            if Errno::last() == Errno::EINTR {
                continue;
            }
            return Err(Errno::last());
        }
        bytes = &bytes[n as usize..];
    }
    Ok(())
}

fn cstring(bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|_| {
        SpawnwatchError::InvalidRequest("path or argument contains a NUL byte".to_string())
    })
}

/// Build `KEY=VALUE` environment strings per the request's env spec.
fn build_envp(env: &EnvSpec) -> Result<Vec<CString>> {
    match env {
        EnvSpec::Inherit { overrides } => {
            let mut out = Vec::new();
            for (key, value) in std::env::vars_os() {
                if overrides.iter().any(|(k, _)| k.as_bytes() == key.as_bytes()) {
                    continue;
                }
                let mut kv = Vec::with_capacity(key.len() + value.len() + 1);
                kv.extend_from_slice(key.as_bytes());
                kv.push(b'=');
                kv.extend_from_slice(value.as_bytes());
                // Inherited entries with NUL bytes cannot be represented; skip.
                if let Ok(entry) = CString::new(kv) {
                    out.push(entry);
                }
            }
            for (key, value) in overrides {
                out.push(env_pair(key, value)?);
            }
            Ok(out)
        }
        EnvSpec::Explicit(vars) => vars.iter().map(|(k, v)| env_pair(k, v)).collect(),
    }
}

fn env_pair(key: &str, value: &str) -> Result<CString> {
    if key.is_empty() || key.contains('=') {
        return Err(SpawnwatchError::InvalidRequest(format!(
            "invalid environment variable name '{key}'"
        )));
    }
    cstring(format!("{key}={value}").as_bytes())
}

fn null_terminated(strings: &[CString]) -> Vec<*const libc::c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}
