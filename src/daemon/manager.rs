// Daemon lifecycle management

use super::daemonize::{daemonize, Detach};
use super::pid::{probe_liveness, PidFile};
use super::signals::{self, RunFlag};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use crate::service::{run_loop, Service};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

/// Logical lifecycle state, recomputed from the pidfile on every command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    NotRunning,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonState::NotRunning => write!(f, "not running"),
            DaemonState::Starting => write!(f, "starting"),
            DaemonState::Running => write!(f, "running"),
            DaemonState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Daemon status information
#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub state: DaemonState,
    /// PID recorded in the pidfile, whether or not it is alive
    pub pid: Option<u32>,
    pub pid_file: PathBuf,
    /// Pidfile modification time, i.e. when the instance started
    pub since: Option<SystemTime>,
}

impl DaemonStatus {
    pub fn is_running(&self) -> bool {
        self.state == DaemonState::Running
    }

    /// A pidfile is on record but its process is gone
    pub fn is_stale(&self) -> bool {
        self.pid.is_some() && !self.is_running()
    }
}

/// Result of a `stop` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No pidfile; nothing to do
    NotRunning,
    /// The process is gone and the pidfile removed
    Stopped { pid: u32 },
}

/// Drives start/stop/restart/status for one daemon identity
pub struct DaemonManager {
    config: DaemonConfig,
    pid_file: PidFile,
}

impl DaemonManager {
    pub fn new(config: DaemonConfig) -> Self {
        let pid_file = PidFile::with_path(config.pid_file());
        Self { config, pid_file }
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn pid_file(&self) -> &PidFile {
        &self.pid_file
    }

    /// Refuse to start when any pidfile is on record.
    ///
    /// Liveness is deliberately not probed here: a pidfile left behind by a
    /// crash also blocks `start` until `stop` clears it.
    pub fn ensure_not_running(&self) -> Result<()> {
        match self.pid_file.read() {
            Some(pid) => Err(DaemonError::AlreadyRunning {
                path: self.pid_file.path().to_path_buf(),
                pid,
            }),
            None => Ok(()),
        }
    }

    /// Detach and run `service` until a shutdown signal arrives.
    ///
    /// The calling process exits inside this function once the first fork
    /// succeeds; only the detached daemon returns from it.
    pub fn start<S: Service>(&self, service: &mut S) -> Result<()> {
        self.ensure_not_running()?;

        daemonize(Detach {
            working_dir: &self.config.working_dir,
            log_file: &self.config.log_file(),
        })?;

        self.run_service(service)
    }

    /// Run `service` in the foreground under the same pidfile protocol
    pub fn run<S: Service>(&self, service: &mut S) -> Result<()> {
        self.ensure_not_running()?;
        self.run_service(service)
    }

    fn run_service<S: Service>(&self, service: &mut S) -> Result<()> {
        crate::logging::init(&self.config.log_level);

        // Handlers go in first: once the pidfile is visible, SIGTERM must
        // reach the flag rather than the default action
        let flag = RunFlag::new();
        signals::install(&flag)?;

        let guard = self.pid_file.write(std::process::id())?;

        tracing::info!(
            "{} started with PID {}",
            self.config.name,
            guard.pid()
        );

        let result = run_loop(service, &flag, self.config.interval());

        tracing::info!("{} stopped", self.config.name);
        drop(guard);

        result.map(|_| ())
    }

    /// Stop the daemon by sending SIGTERM until it disappears
    pub fn stop(&self) -> Result<StopOutcome> {
        self.stop_with(|_| {})
    }

    /// Like [`stop`](Self::stop), calling `on_poll` with the elapsed time
    /// after each termination signal
    #[cfg(unix)]
    pub fn stop_with<F>(&self, on_poll: F) -> Result<StopOutcome>
    where
        F: FnMut(Duration),
    {
        use nix::sys::signal::{kill, Signal};

        self.stop_using(on_poll, |pid| kill(pid, Signal::SIGTERM))
    }

    #[cfg(not(unix))]
    pub fn stop_with<F>(&self, _on_poll: F) -> Result<StopOutcome>
    where
        F: FnMut(Duration),
    {
        Err(DaemonError::Detach(
            "Daemon stop is only supported on Unix systems".to_string(),
        ))
    }

    /// Stop protocol with the signal delivery supplied by the caller
    #[cfg(unix)]
    fn stop_using<F, S>(&self, mut on_poll: F, mut send: S) -> Result<StopOutcome>
    where
        F: FnMut(Duration),
        S: FnMut(nix::unistd::Pid) -> nix::Result<()>,
    {
        let pid = match self.pid_file.read() {
            Some(pid) => pid,
            None => return Ok(StopOutcome::NotRunning),
        };

        let interval = self.config.stop_poll_interval();
        let timeout = self.config.stop_timeout();
        let started = Instant::now();

        while terminate(pid, &mut send)? {
            let waited = started.elapsed();
            if let Some(limit) = timeout {
                if waited >= limit {
                    return Err(DaemonError::StopTimeout { pid, waited });
                }
            }
            on_poll(waited);
            std::thread::sleep(interval);
        }

        self.pid_file.remove()?;
        Ok(StopOutcome::Stopped { pid })
    }

    /// Stop, then start again. Not atomic: another `start` can slip in
    /// between the two.
    ///
    /// `on_stopped` sees the stop outcome before the process detaches.
    pub fn restart<S, F>(&self, service: &mut S, on_stopped: F) -> Result<()>
    where
        S: Service,
        F: FnOnce(StopOutcome),
    {
        let outcome = self.stop()?;
        on_stopped(outcome);
        self.start(service)
    }

    /// Read-only status query; never touches the pidfile
    pub fn status(&self) -> Result<DaemonStatus> {
        let pid = self.pid_file.read();

        let state = match pid {
            Some(pid) if probe_liveness(pid)? => DaemonState::Running,
            _ => DaemonState::NotRunning,
        };

        Ok(DaemonStatus {
            state,
            pid,
            pid_file: self.pid_file.path().to_path_buf(),
            since: pid.and_then(|_| self.pid_file.modified()),
        })
    }
}

/// Deliver a termination signal to `pid` through `send`.
/// `Ok(false)` once the process no longer exists.
#[cfg(unix)]
fn terminate<S>(pid: u32, send: &mut S) -> Result<bool>
where
    S: FnMut(nix::unistd::Pid) -> nix::Result<()>,
{
    use nix::errno::Errno;
    use nix::unistd::Pid;

    if !probe_liveness(pid)? {
        return Ok(false);
    }

    let raw = i32::try_from(pid)
        .map_err(|_| DaemonError::PidFile(format!("PID out of range: {}", pid)))?;

    match send(Pid::from_raw(raw)) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(errno) => Err(DaemonError::Signal {
            pid,
            source: errno.into(),
        }),
    }
}
