// Resource details for a daemon PID, read through sysinfo

use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

/// Point-in-time view of a running daemon process
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSnapshot {
    pub name: String,
    pub memory_bytes: u64,
    pub uptime: Duration,
}

fn refreshed(pid: u32) -> (System, Pid) {
    let sys_pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sys_pid]),
        true,
        ProcessRefreshKind::new().with_memory(),
    );
    (system, sys_pid)
}

/// Collect a snapshot for `pid`, or `None` if the process is not visible
pub fn snapshot(pid: u32) -> Option<ProcessSnapshot> {
    let (system, sys_pid) = refreshed(pid);

    system.process(sys_pid).map(|process| ProcessSnapshot {
        name: process.name().to_string_lossy().into_owned(),
        memory_bytes: process.memory(),
        uptime: Duration::from_secs(process.run_time()),
    })
}

/// Whether `pid` has exited and is only waiting to be reaped.
///
/// A zombie still answers the null signal, so a controller polling it
/// with `kill` alone would never see it disappear.
pub fn is_zombie(pid: u32) -> bool {
    let (system, sys_pid) = refreshed(pid);

    system
        .process(sys_pid)
        .map(|process| process.status() == ProcessStatus::Zombie)
        .unwrap_or(false)
}
