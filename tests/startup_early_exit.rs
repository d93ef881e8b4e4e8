// tests/startup_early_exit.rs

mod common;
use crate::common::{init_tracing, quick_policy, write_script, CollectingSink};

use std::sync::Arc;

use spawnwatch::errors::SpawnwatchError;
use spawnwatch::launch::LaunchRequest;
use spawnwatch::session::Session;

/// A child that exits non-zero inside the window is an early exit with
/// the exit code, reported synchronously from `start`.
#[test]
fn fast_exit_with_code_is_reported_as_early_exit() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "dies.sh", "echo dying\nexit 1");

    let sink = CollectingSink::new();
    let mut session = Session::with_policy(Arc::new(sink.clone()), quick_policy());

    let err = session
        .start(&LaunchRequest::new(&script))
        .expect_err("fast exit must not produce a live handle");

    match &err {
        SpawnwatchError::EarlyExit(reason) => {
            assert_eq!(reason.to_string(), "exit code 1");
        }
        other => panic!("expected EarlyExit, got: {other}"),
    }

    assert!(sink.contains("dying"), "output before the exit reaches the sink");
    assert!(!session.is_alive());
}

/// Death by signal must carry the signal, never an exit code.
#[test]
fn death_by_signal_is_not_conflated_with_an_exit_code() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "suicide.sh", "kill -KILL $$");

    let sink = CollectingSink::new();
    let mut session = Session::with_policy(Arc::new(sink), quick_policy());

    let err = session
        .start(&LaunchRequest::new(&script))
        .expect_err("signalled child must not produce a live handle");

    match &err {
        SpawnwatchError::EarlyExit(reason) => {
            let reason = reason.to_string();
            assert!(reason.starts_with("signal 9"), "got reason: {reason}");
            assert!(!reason.contains("exit code"), "got reason: {reason}");
        }
        other => panic!("expected EarlyExit, got: {other}"),
    }
}

/// Exit code 0 inside the window is still an early exit — the process
/// never reached running.
#[test]
fn clean_fast_exit_is_still_an_early_exit() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "quick.sh", "exit 0");

    let sink = CollectingSink::new();
    let mut session = Session::with_policy(Arc::new(sink), quick_policy());

    let err = session.start(&LaunchRequest::new(&script)).unwrap_err();
    match &err {
        SpawnwatchError::EarlyExit(reason) => assert_eq!(reason.to_string(), "exit code 0"),
        other => panic!("expected EarlyExit, got: {other}"),
    }
}

/// A nonexistent program fails exec in the child; the reserved status
/// comes back as ExecFailed and the child's errno report reaches the
/// sink through the pipe.
#[test]
fn missing_program_reports_exec_failure() {
    init_tracing();

    let sink = CollectingSink::new();
    let mut session = Session::with_policy(Arc::new(sink.clone()), quick_policy());

    let err = session
        .start(&LaunchRequest::new("/definitely/not/a/real/binary"))
        .expect_err("missing program must fail");

    assert!(
        matches!(err, SpawnwatchError::ExecFailed { .. }),
        "expected ExecFailed, got: {err}"
    );
    assert!(
        sink.contains("exec failed"),
        "child's diagnostic line should arrive through the pipe"
    );
}
