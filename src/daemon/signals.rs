// Shutdown flag shared between signal handlers and the run loop

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative "keep running" flag.
///
/// Internally this stores a stop request, which is what the signal handlers
/// set; a fresh flag is running.
#[derive(Debug, Clone, Default)]
pub struct RunFlag {
    stop_requested: Arc<AtomicBool>,
}

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the run loop should keep iterating
    pub fn is_running(&self) -> bool {
        !self.stop_requested.load(Ordering::SeqCst)
    }

    /// Ask the run loop to exit after the current iteration
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }
}

/// Install SIGTERM and SIGINT handlers that flip `flag` to stopped.
///
/// The handlers only store to the atomic. No other signal is touched.
#[cfg(unix)]
pub fn install(flag: &RunFlag) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};

    for signal in [SIGTERM, SIGINT] {
        signal_hook::flag::register(signal, Arc::clone(&flag.stop_requested))?;
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn install(_flag: &RunFlag) -> Result<()> {
    Err(crate::error::DaemonError::Detach(
        "Signal handling is only supported on Unix systems".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_starts_running() {
        assert!(RunFlag::new().is_running());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = RunFlag::new();
        let handle = flag.clone();

        handle.request_stop();
        assert!(!flag.is_running());
    }

    #[test]
    #[cfg(unix)]
    fn test_sigterm_flips_flag() {
        let flag = RunFlag::new();
        install(&flag).unwrap();

        signal_hook::low_level::raise(signal_hook::consts::SIGTERM).unwrap();

        assert!(!flag.is_running());
    }

    #[test]
    #[cfg(unix)]
    fn test_sigint_flips_flag() {
        let flag = RunFlag::new();
        install(&flag).unwrap();

        signal_hook::low_level::raise(signal_hook::consts::SIGINT).unwrap();

        assert!(!flag.is_running());
    }
}
