// CLI module - User-facing command-line interface

mod output;

use crate::config::{DaemonConfig, CONFIG_ENV};
use crate::daemon::{process_info, DaemonManager};
use crate::error::Result;
use crate::service::Heartbeat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// daemonkit - run a service as a detached Unix daemon
#[derive(Debug, Parser)]
#[command(name = "daemonkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Lifecycle command
    #[arg(value_enum)]
    command: Command,

    /// Configuration file (.toml or .json)
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Command {
    /// Detach and start the daemon
    Start,
    /// Stop the running daemon
    Stop,
    /// Stop, then start the daemon
    Restart,
    /// Report whether the daemon is running
    Status,
    /// Run the service in the foreground without detaching
    Run,
}

impl Cli {
    /// Run the CLI application.
    ///
    /// Argument errors never get here: clap prints usage and exits with
    /// status 2.
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        let config = DaemonConfig::load(self.config.as_deref())?;
        let manager = DaemonManager::new(config);
        let mut service = Heartbeat::new(manager.config().name.clone());

        match self.command {
            Command::Start => {
                manager.ensure_not_running()?;
                output::print_starting(manager.config());
                manager.start(&mut service)
            }

            Command::Stop => {
                let progress = output::create_progress_bar(&format!(
                    "Stopping {}...",
                    manager.config().name
                ));
                let result = manager.stop_with(|_| progress.tick());
                progress.finish_and_clear();

                output::print_stop_outcome(manager.config(), result?);
                Ok(())
            }

            Command::Restart => manager.restart(&mut service, |outcome| {
                output::print_stop_outcome(manager.config(), outcome);
                output::print_starting(manager.config());
            }),

            Command::Status => {
                let status = manager.status()?;
                let snapshot = status
                    .pid
                    .filter(|_| status.is_running())
                    .and_then(process_info::snapshot);
                output::print_status(&manager.config().name, &status, snapshot.as_ref());
                Ok(())
            }

            Command::Run => manager.run(&mut service),
        }
    }
}
