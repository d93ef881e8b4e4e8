#![allow(dead_code)]

pub use spawnwatch_test_utils::{init_tracing, CollectingSink};

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use spawnwatch::supervise::StartupPolicy;

/// Write an executable `/bin/sh` fixture script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fixture script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("chmod fixture script");
    path
}

/// Locate a real `sleep` binary to copy around in exec-fallback tests.
pub fn find_sleep_binary() -> PathBuf {
    for candidate in ["/bin/sleep", "/usr/bin/sleep"] {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return path;
        }
    }
    panic!("no sleep binary found on this system");
}

/// A short startup window so the suite stays fast.
pub fn quick_policy() -> StartupPolicy {
    StartupPolicy {
        window: Duration::from_millis(400),
        tick: Duration::from_millis(50),
    }
}

/// True if `/proc/<pid>` exists, i.e. the pid is visible to the OS.
pub fn os_sees_pid(pid: i32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

/// Number of open descriptors in this process, for leak checks.
pub fn open_fd_count() -> usize {
    fs::read_dir("/proc/self/fd")
        .expect("read /proc/self/fd")
        .count()
}
