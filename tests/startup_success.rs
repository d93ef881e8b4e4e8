// tests/startup_success.rs

mod common;
use crate::common::{init_tracing, os_sees_pid, quick_policy, write_script, CollectingSink};

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use spawnwatch::launch::LaunchRequest;
use spawnwatch::session::Session;
use spawnwatch::supervise::ProcessState;

/// A child that prints a banner and then idles must survive the startup
/// window, and the banner must have reached the sink by then.
#[test]
fn ready_then_idle_child_reaches_running() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "ready.sh", "echo ready\nsleep 30");

    let sink = CollectingSink::new();
    let mut session = Session::with_policy(Arc::new(sink.clone()), quick_policy());

    session
        .start(&LaunchRequest::new(&script))
        .expect("start should succeed for an idling child");

    assert_eq!(session.state(), Some(ProcessState::Running));
    assert!(sink.contains("ready"), "banner should reach the sink during startup");

    let pid = session.pid().expect("running session has a pid");
    assert!(pid > 0);
    assert!(os_sees_pid(pid), "pid should be OS-visible while running");
    assert!(session.is_alive());

    session.stop();
}

/// `stop()` invalidates the pid immediately and is idempotent: a second
/// call must not error or double-close anything.
#[test]
fn stop_is_immediate_and_idempotent() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "idle.sh", "sleep 30");

    let sink = CollectingSink::new();
    let mut session = Session::with_policy(Arc::new(sink), quick_policy());
    session.start(&LaunchRequest::new(&script)).unwrap();

    session.stop();
    assert!(!session.is_alive(), "is_alive must be false right after stop");

    session.stop();
    assert!(!session.is_alive());
    assert!(session.read_output().is_empty());
}

/// Starting while a child is already running is a no-op; the original
/// child keeps its pid.
#[test]
fn start_while_running_is_a_no_op() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "idle.sh", "sleep 30");

    let sink = CollectingSink::new();
    let mut session = Session::with_policy(Arc::new(sink), quick_policy());
    session.start(&LaunchRequest::new(&script)).unwrap();

    let first_pid = session.pid().unwrap();
    session.start(&LaunchRequest::new(&script)).unwrap();
    assert_eq!(session.pid(), Some(first_pid));

    session.stop();
}

/// The graceful SIGTERM from `stop()` actually terminates a default
/// `sh` child (observed via the OS, since the handle forgets the pid).
#[test]
fn stop_terminates_the_child_process() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "idle.sh", "sleep 30");

    let sink = CollectingSink::new();
    let mut session = Session::with_policy(Arc::new(sink), quick_policy());
    session.start(&LaunchRequest::new(&script)).unwrap();

    let pid = session.pid().unwrap();
    session.stop();

    // The child stays a zombie until the session's process exits, but it
    // must stop executing: /proc/<pid> either disappears or reads as a
    // zombie shortly after the signal.
    let mut terminated = false;
    for _ in 0..50 {
        if !os_sees_pid(pid) || proc_is_zombie(pid) {
            terminated = true;
            break;
        }
        sleep(Duration::from_millis(20));
    }
    assert!(terminated, "child should die soon after SIGTERM");
}

fn proc_is_zombie(pid: i32) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .map(|stat| stat.contains(") Z"))
        .unwrap_or(false)
}
