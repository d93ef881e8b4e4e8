// tests/fd_leak.rs

//! Descriptor accounting for failed launches. Kept in its own test
//! binary so concurrent tests can't perturb the process-wide fd count.

mod common;
use crate::common::{init_tracing, open_fd_count, quick_policy, CollectingSink};

use std::sync::Arc;

use spawnwatch::launch::LaunchRequest;
use spawnwatch::session::Session;

/// A launch that fails (missing target) must return the open-descriptor
/// count to its pre-call value: both pipe ends are accounted for on the
/// failure path.
#[test]
fn failed_launch_leaks_no_descriptors() {
    init_tracing();

    let sink = CollectingSink::new();
    let mut session = Session::with_policy(Arc::new(sink), quick_policy());

    // One warm-up launch so lazy initialisation (tracing, etc.) doesn't
    // show up in the measurement.
    let _ = session.start(&LaunchRequest::new("/definitely/not/a/real/binary"));

    let before = open_fd_count();
    for _ in 0..3 {
        let _ = session.start(&LaunchRequest::new("/definitely/not/a/real/binary"));
    }
    let after = open_fd_count();

    assert_eq!(before, after, "no descriptor may leak from failed launches");
}
