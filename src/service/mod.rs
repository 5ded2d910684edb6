// Service module - The unit of work the daemon repeats once detached

mod heartbeat;

pub use heartbeat::Heartbeat;

use crate::daemon::RunFlag;
use crate::error::Result;
use std::time::Duration;

/// Longest single sleep between flag checks while waiting out an interval
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// The caller-supplied body of a daemon.
///
/// `run_once` performs one unit of work. The run loop never interrupts it;
/// the stop flag is only consulted between iterations.
pub trait Service {
    /// Name used in log lines
    fn name(&self) -> &str;

    /// Perform one iteration of work
    fn run_once(&mut self) -> Result<()>;

    /// Called once before the first iteration
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after the loop has exited
    fn on_stop(&mut self) {}
}

/// Drive `service` until `flag` stops running.
///
/// Iteration errors are logged and the loop carries on. Returns the number
/// of completed iterations.
pub fn run_loop<S: Service + ?Sized>(
    service: &mut S,
    flag: &RunFlag,
    interval: Duration,
) -> Result<u64> {
    service.on_start()?;
    tracing::info!(service = service.name(), pid = std::process::id(), "service started");

    let mut iterations = 0u64;
    loop {
        if let Err(e) = service.run_once() {
            tracing::error!(service = service.name(), "Error in daemon loop: {}", e);
        }
        iterations += 1;

        if !flag.is_running() {
            break;
        }

        sleep_while_running(flag, interval);

        if !flag.is_running() {
            break;
        }
    }

    tracing::info!(service = service.name(), iterations, "shutdown requested, service stopped");
    service.on_stop();

    Ok(iterations)
}

/// Sleep up to `interval`, returning early once a stop is requested
fn sleep_while_running(flag: &RunFlag, interval: Duration) {
    let mut remaining = interval;
    while !remaining.is_zero() && flag.is_running() {
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}
