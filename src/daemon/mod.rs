// Daemon module - Detachment, pidfile protocol and lifecycle commands

pub mod daemonize;
pub mod manager;
pub mod pid;
pub mod process_info;
pub mod signals;

pub use daemonize::{daemonize, Detach};
pub use manager::{DaemonManager, DaemonState, DaemonStatus, StopOutcome};
pub use pid::{probe_liveness, PidFile, PidFileGuard};
pub use signals::RunFlag;
