// Output formatting and display for CLI

use crate::config::DaemonConfig;
use crate::daemon::process_info::ProcessSnapshot;
use crate::daemon::{DaemonStatus, StopOutcome};
use chrono::{DateTime, Local};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Announce a start before the process detaches
pub fn print_starting(config: &DaemonConfig) {
    println!("{}", format!("✓ Starting {}", config.name).green().bold());
    println!("  {}: {}", "PID file".bold(), config.pid_file().display());
    println!("  {}: {}", "Log file".bold(), config.log_file().display());
}

/// Report the result of a stop
pub fn print_stop_outcome(config: &DaemonConfig, outcome: StopOutcome) {
    match outcome {
        StopOutcome::NotRunning => print_info(&format!(
            "Pidfile {} does not exist. {} not running?",
            config.pid_file().display(),
            config.name
        )),
        StopOutcome::Stopped { pid } => println!(
            "{}",
            format!("✓ {} (PID {}) stopped", config.name, pid)
                .green()
                .bold()
        ),
    }
}

/// Print the status block
pub fn print_status(name: &str, status: &DaemonStatus, snapshot: Option<&ProcessSnapshot>) {
    match status.pid {
        Some(pid) if status.is_running() => {
            println!("{}", format!("✓ {} is running with PID {}", name, pid).green().bold());
            println!("  {:<10} {}", "PID file:".bold(), status.pid_file.display());

            if let Some(since) = status.since {
                let datetime: DateTime<Local> = since.into();
                println!(
                    "  {:<10} {}",
                    "Since:".bold(),
                    datetime.format("%Y-%m-%d %H:%M:%S")
                );
            }

            if let Some(snapshot) = snapshot {
                println!("  {:<10} {}", "Process:".bold(), snapshot.name.cyan());
                println!("  {:<10} {}", "Memory:".bold(), format_memory(snapshot.memory_bytes));
                println!("  {:<10} {}", "Uptime:".bold(), format_duration(&snapshot.uptime));
            }
        }
        Some(pid) => {
            println!("{}", format!("✗ {} is not running", name).red().bold());
            println!(
                "  {}",
                format!(
                    "Stale pidfile {} records PID {}",
                    status.pid_file.display(),
                    pid
                )
                .yellow()
            );
        }
        None => println!("{}", format!("✗ {} is not running", name).red().bold()),
    }
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a duration in human-readable format
fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}

/// Format memory usage in human-readable format
fn format_memory(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

/// Spinner advanced by the caller.
///
/// No steady-tick thread: `restart` forks right after stopping, and the
/// process must be single-threaded by then.
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb
}
