// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod launch;
pub mod logging;
pub mod session;
pub mod sink;
pub mod supervise;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::model::LaunchFile;
use crate::launch::{EnvSpec, LaunchRequest};
use crate::session::Session;
use crate::sink::{LineBuffer, LogSink, StdoutSink};
use crate::supervise::{ProcessState, StartupPolicy};

/// Warn when the child has been silent for this long in the reader loop.
const QUIET_WARN_AFTER: Duration = Duration::from_secs(30);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - launch-file loading / CLI overrides
/// - the session (launch + startup supervision)
/// - the output reader loop
/// - Ctrl-C handling
pub fn run(args: CliArgs) -> Result<()> {
    let plan = resolve_plan(&args)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    let sink: Arc<dyn LogSink> = Arc::new(StdoutSink);
    let mut session = Session::with_policy(Arc::clone(&sink), plan.policy.clone());

    session.start(&plan.request)?;
    info!(pid = session.pid(), "child is running");

    // Ctrl-C → graceful stop.
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;
    }

    reader_loop(&mut session, &plan.policy, sink.as_ref(), &interrupted);
    Ok(())
}

/// Poll the running child: forward its output lines, watch liveness,
/// stop on interrupt. Each iteration sleeps one tick, so this blocks
/// only the calling thread and only one tick at a time.
fn reader_loop(
    session: &mut Session,
    policy: &StartupPolicy,
    sink: &dyn LogSink,
    interrupted: &AtomicBool,
) {
    let mut lines = LineBuffer::new();
    let quiet_warn_ticks = (QUIET_WARN_AFTER.as_millis() / policy.tick.as_millis().max(1)).max(1);
    let mut quiet_ticks: u128 = 0;

    loop {
        if interrupted.load(Ordering::SeqCst) {
            info!("interrupt received; stopping child");
            session.stop();
            break;
        }

        let chunk = session.read_output();
        if chunk.is_empty() {
            quiet_ticks += 1;
            if quiet_ticks == quiet_warn_ticks {
                warn!(
                    quiet_secs = QUIET_WARN_AFTER.as_secs(),
                    "no output from child"
                );
            }
        } else {
            quiet_ticks = 0;
            lines.push(&chunk, sink);
        }

        if !session.is_alive() {
            // Pull out whatever the pipe still buffers before reporting.
            loop {
                let rest = session.read_output();
                if rest.is_empty() {
                    break;
                }
                lines.push(&rest, sink);
            }
            lines.flush(sink);

            match session.state() {
                Some(ProcessState::Exited(reason)) => info!(%reason, "child exited"),
                Some(ProcessState::ReapedExternally) => {
                    warn!("child was reaped outside this session")
                }
                _ => {}
            }
            break;
        }

        std::thread::sleep(policy.tick);
    }
}

/// The resolved "what to launch and how to watch it" for this run.
struct LaunchPlan {
    request: LaunchRequest,
    policy: StartupPolicy,
}

/// Merge the launch file (if any) with CLI overrides.
///
/// A PROGRAM on the command line wins over the launch file; an explicit
/// `--config` is always loaded, while the default `Spawnwatch.toml` is
/// only consulted when no PROGRAM was given.
fn resolve_plan(args: &CliArgs) -> Result<LaunchPlan> {
    let file: Option<LaunchFile> = match &args.config {
        Some(path) => Some(config::load_and_validate(path)?),
        None => {
            let default = config::default_config_path();
            if args.program.is_none() && default.exists() {
                debug!(path = %default.display(), "using default launch file");
                Some(config::load_and_validate(&default)?)
            } else {
                None
            }
        }
    };

    let request = match (&args.program, &file) {
        (Some(program), _) => {
            let env = if args.no_inherit_env {
                EnvSpec::Explicit(Vec::new())
            } else {
                EnvSpec::default()
            };
            LaunchRequest::new(program)
                .args(args.args.clone())
                .env_spec(env)
        }
        (None, Some(file)) => {
            let mut request = file.to_request();
            if args.no_inherit_env {
                request.env = match request.env {
                    EnvSpec::Inherit { overrides } => EnvSpec::Explicit(overrides),
                    explicit => explicit,
                };
            }
            request
        }
        (None, None) => {
            bail!("nothing to launch: pass PROGRAM or provide a Spawnwatch.toml")
        }
    };

    let mut policy = file
        .as_ref()
        .map(LaunchFile::to_policy)
        .unwrap_or_default();
    if let Some(ms) = args.startup_window_ms {
        policy.window = Duration::from_millis(ms);
    }
    if let Some(ms) = args.tick_ms {
        policy.tick = Duration::from_millis(ms);
    }
    if policy.tick.is_zero() {
        bail!("--tick-ms must be >= 1");
    }
    if policy.tick > policy.window {
        bail!("--tick-ms must not exceed the startup window");
    }

    Ok(LaunchPlan { request, policy })
}

/// Simple dry-run output: print the launch plan without forking.
fn print_dry_run(plan: &LaunchPlan) {
    println!("spawnwatch dry-run");
    println!("  program: {}", plan.request.program.display());
    println!("  args: {:?}", plan.request.args);
    match &plan.request.env {
        EnvSpec::Inherit { overrides } => {
            println!("  env: inherit parent (+{} overrides)", overrides.len())
        }
        EnvSpec::Explicit(vars) => println!("  env: explicit ({} vars)", vars.len()),
    }
    println!(
        "  startup window: {} ms, tick: {} ms",
        plan.policy.window.as_millis(),
        plan.policy.tick.as_millis()
    );

    debug!("dry-run complete (no fork)");
}
