// src/supervise/mod.rs

//! Startup supervision and the running-process handle.
//!
//! - [`startup`] owns the bounded polling loop that decides whether a
//!   freshly forked child survives its startup window.
//! - [`handle`] is the caller-facing state for one running child:
//!   liveness, output draining, graceful stop.

pub mod handle;
pub mod startup;

pub use handle::{ExitReason, ProcessHandle, ProcessState};
pub use startup::{supervise_startup, StartupPolicy};
