// Daemonization support for Unix systems

use crate::error::{DaemonError, Result};
use std::path::Path;

/// Where the detached process sends its standard streams
#[derive(Debug, Clone, Copy)]
pub struct Detach<'a> {
    /// Directory to move into after the first fork
    pub working_dir: &'a Path,
    /// File receiving stdout and stderr in append mode
    pub log_file: &'a Path,
}

/// Double-fork away from the controlling terminal.
///
/// Returns only in the final grandchild. The invoking process and the
/// intermediate child both exit with status 0. A failed fork is returned as
/// an error while stderr still reaches the caller's terminal.
#[cfg(unix)]
pub fn daemonize(opts: Detach<'_>) -> Result<()> {
    use nix::sys::stat::{umask, Mode};
    use nix::unistd::{fork, setsid, ForkResult};
    use std::io::Write;

    // First fork
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => std::process::exit(0),
        Ok(ForkResult::Child) => {}
        Err(e) => {
            return Err(DaemonError::Fork {
                stage: 1,
                source: e.into(),
            })
        }
    }

    // Decouple from the parent environment
    std::env::set_current_dir(opts.working_dir).map_err(|e| {
        DaemonError::Detach(format!(
            "Failed to change directory to {}: {}",
            opts.working_dir.display(),
            e
        ))
    })?;
    setsid().map_err(|e| DaemonError::Detach(format!("setsid failed: {}", e)))?;
    umask(Mode::empty());

    // Second fork, so the daemon is no longer a session leader and can never
    // reacquire a controlling terminal
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => std::process::exit(0),
        Ok(ForkResult::Child) => {}
        Err(e) => {
            return Err(DaemonError::Fork {
                stage: 2,
                source: e.into(),
            })
        }
    }

    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    redirect_stdio(opts.log_file)
}

/// Point stdin at /dev/null and append stdout/stderr to `log_file`
#[cfg(unix)]
fn redirect_stdio(log_file: &Path) -> Result<()> {
    use nix::libc;
    use nix::unistd::dup2;
    use std::fs::OpenOptions;
    use std::os::unix::io::AsRawFd;

    let devnull = OpenOptions::new()
        .read(true)
        .open("/dev/null")
        .map_err(|e| DaemonError::Detach(format!("Failed to open /dev/null: {}", e)))?;

    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| {
            DaemonError::Detach(format!(
                "Failed to open log file {}: {}",
                log_file.display(),
                e
            ))
        })?;

    let redirects = [
        (devnull.as_raw_fd(), libc::STDIN_FILENO),
        (log.as_raw_fd(), libc::STDOUT_FILENO),
        (log.as_raw_fd(), libc::STDERR_FILENO),
    ];
    for (from, to) in redirects {
        dup2(from, to)
            .map_err(|e| DaemonError::Detach(format!("dup2 onto fd {} failed: {}", to, e)))?;
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn daemonize(_opts: Detach<'_>) -> Result<()> {
    Err(DaemonError::Detach(
        "Daemonization is only supported on Unix systems".to_string(),
    ))
}
