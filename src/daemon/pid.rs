// PID file management for daemon process

use crate::error::{DaemonError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Manages the single-instance marker file of one daemon identity
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Create a PID file manager for the given path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write `pid` followed by a newline, truncating any previous content.
    ///
    /// The returned guard removes the file when dropped, so an ordinary exit
    /// of the daemon never leaves the pidfile behind. Call this only in the
    /// final, detached process.
    pub fn write(&self, pid: u32) -> Result<PidFileGuard> {
        fs::write(&self.path, format!("{}\n", pid)).map_err(|e| {
            DaemonError::PidFile(format!(
                "Failed to write PID file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(pid, path = %self.path.display(), "pidfile written");

        Ok(PidFileGuard {
            pid_file: self.clone(),
            pid,
        })
    }

    /// Read the recorded PID.
    ///
    /// A missing, unreadable or malformed file all read as `None`.
    pub fn read(&self) -> Option<u32> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| content.trim().parse::<u32>().ok())
            .filter(|pid| *pid > 0)
    }

    /// Remove the PID file; absent files are not an error
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DaemonError::PidFile(format!(
                "Failed to remove PID file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Check if the PID file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Modification time of the PID file, if it exists
    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    /// Get the path to the PID file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Send the null signal to `pid` to test for its existence.
///
/// `Ok(false)` means the OS reported "no such process" (or the process has
/// already exited and only its zombie entry remains). Every other failure,
/// including permission errors, is returned to the caller.
#[cfg(unix)]
pub fn probe_liveness(pid: u32) -> Result<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| DaemonError::PidFile(format!("PID out of range: {}", pid)))?;

    match kill(Pid::from_raw(raw), None) {
        Ok(()) => Ok(!super::process_info::is_zombie(pid)),
        Err(Errno::ESRCH) => Ok(false),
        Err(errno) => Err(DaemonError::Signal {
            pid,
            source: errno.into(),
        }),
    }
}

#[cfg(not(unix))]
pub fn probe_liveness(_pid: u32) -> Result<bool> {
    Err(DaemonError::Detach(
        "Liveness probing is only supported on Unix systems".to_string(),
    ))
}

/// Removes the pidfile on drop if it still records the owning process
#[derive(Debug)]
#[must_use = "dropping the guard removes the pidfile"]
pub struct PidFileGuard {
    pid_file: PidFile,
    pid: u32,
}

impl PidFileGuard {
    /// The PID this guard recorded
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        // A controller may already have removed it, or a newer instance
        // may own the path now.
        if self.pid_file.read() != Some(self.pid) {
            return;
        }

        if let Err(e) = self.pid_file.remove() {
            tracing::warn!("Failed to clean up pidfile: {}", e);
        }
    }
}
