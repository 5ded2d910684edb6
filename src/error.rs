use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the daemon supervisor
#[derive(Debug, Error)]
pub enum DaemonError {
    // Launch errors
    #[error("Fork #{stage} failed: {source}")]
    Fork {
        stage: u8,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to detach from terminal: {0}")]
    Detach(String),

    // Pidfile protocol
    #[error("Pidfile {} already exists (pid {pid}). Daemon already running?", path.display())]
    AlreadyRunning { path: PathBuf, pid: u32 },

    #[error("Pidfile error: {0}")]
    PidFile(String),

    // Process control
    #[error("Failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Process {pid} still alive after {}s", waited.as_secs())]
    StopTimeout { pid: u32, waited: Duration },

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Service body
    #[error("Service error: {0}")]
    Service(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(unix)]
impl From<nix::errno::Errno> for DaemonError {
    fn from(errno: nix::errno::Errno) -> Self {
        DaemonError::Io(std::io::Error::from(errno))
    }
}

/// Result type alias for daemon operations
pub type Result<T> = std::result::Result<T, DaemonError>;
