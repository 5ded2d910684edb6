use crate::error::{DaemonError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "DAEMONKIT_CONFIG";
/// Environment override for the pidfile path
pub const PID_FILE_ENV: &str = "DAEMONKIT_PID_FILE";
/// Environment override for the log file path
pub const LOG_FILE_ENV: &str = "DAEMONKIT_LOG_FILE";
/// Environment override for the run-loop interval
pub const INTERVAL_ENV: &str = "DAEMONKIT_INTERVAL_SECS";
/// Environment override for the stop timeout
pub const STOP_TIMEOUT_ENV: &str = "DAEMONKIT_STOP_TIMEOUT_SECS";

/// Daemon configuration with every path and interval the supervisor uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Daemon identity, used in messages and default paths
    #[serde(default = "default_name")]
    pub name: String,

    /// Pidfile location (defaults to /tmp/<name>.pid)
    #[serde(default)]
    pub pid_file: Option<PathBuf>,

    /// Destination for stdout and stderr once detached (defaults to /tmp/<name>.log)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Directory the detached process moves into
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Sleep between run-loop iterations (in seconds)
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Delay between termination signals sent by `stop` (in milliseconds)
    #[serde(default = "default_stop_poll_interval")]
    pub stop_poll_interval_ms: u64,

    /// Upper bound on the `stop` polling loop; unbounded when absent
    #[serde(default)]
    pub stop_timeout_secs: Option<u64>,

    /// Tracing filter used inside the daemon
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions for serde
fn default_name() -> String {
    "daemonkit".to_string()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("/")
}

fn default_interval() -> u64 {
    30
}

fn default_stop_poll_interval() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            pid_file: None,
            log_file: None,
            working_dir: default_working_dir(),
            interval_secs: default_interval(),
            stop_poll_interval_ms: default_stop_poll_interval(),
            stop_timeout_secs: None,
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => toml::from_str::<DaemonConfig>(&contents)
                .map_err(|e| DaemonError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?,
            "json" => serde_json::from_str::<DaemonConfig>(&contents)
                .map_err(|e| DaemonError::InvalidConfig(format!("Failed to parse JSON: {}", e)))?,
            _ => {
                return Err(DaemonError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Resolve the configuration used by the binary: an optional file, then
    /// individual environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        let cwd = std::env::current_dir()?;
        config.anchor_paths(&cwd);

        Ok(config)
    }

    /// Resolve relative pid/log paths against `base`; the daemon changes
    /// directory before it touches either file.
    fn anchor_paths(&mut self, base: &Path) {
        self.pid_file = Some(base.join(self.pid_file()));
        self.log_file = Some(base.join(self.log_file()));
    }

    /// Apply `DAEMONKIT_*` overrides using the given variable lookup
    fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(pid_file) = lookup(PID_FILE_ENV) {
            self.pid_file = Some(PathBuf::from(pid_file));
        }

        if let Some(log_file) = lookup(LOG_FILE_ENV) {
            self.log_file = Some(PathBuf::from(log_file));
        }

        if let Some(interval) = lookup(INTERVAL_ENV) {
            self.interval_secs = parse_secs(INTERVAL_ENV, &interval)?;
        }

        if let Some(timeout) = lookup(STOP_TIMEOUT_ENV) {
            self.stop_timeout_secs = Some(parse_secs(STOP_TIMEOUT_ENV, &timeout)?);
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DaemonError::ConfigValidationError(
                "name must not be empty".to_string(),
            ));
        }

        if matches!(&self.pid_file, Some(p) if p.as_os_str().is_empty()) {
            return Err(DaemonError::ConfigValidationError(
                "pid_file must not be empty".to_string(),
            ));
        }

        if matches!(&self.log_file, Some(p) if p.as_os_str().is_empty()) {
            return Err(DaemonError::ConfigValidationError(
                "log_file must not be empty".to_string(),
            ));
        }

        if self.interval_secs == 0 {
            return Err(DaemonError::ConfigValidationError(
                "interval_secs must be at least 1".to_string(),
            ));
        }

        if self.stop_poll_interval_ms == 0 {
            return Err(DaemonError::ConfigValidationError(
                "stop_poll_interval_ms must be at least 1".to_string(),
            ));
        }

        if self.stop_timeout_secs == Some(0) {
            return Err(DaemonError::ConfigValidationError(
                "stop_timeout_secs must be at least 1 when set".to_string(),
            ));
        }

        if !self.working_dir.exists() {
            return Err(DaemonError::ConfigValidationError(format!(
                "Working directory does not exist: {}",
                self.working_dir.display()
            )));
        }
        if !self.working_dir.is_dir() {
            return Err(DaemonError::ConfigValidationError(format!(
                "Working directory is not a directory: {}",
                self.working_dir.display()
            )));
        }

        Ok(())
    }

    /// Expand environment variables in path fields
    fn expand_env_vars(&mut self) {
        self.pid_file = self.pid_file.as_deref().map(expand_env_in_path);
        self.log_file = self.log_file.as_deref().map(expand_env_in_path);
        self.working_dir = expand_env_in_path(&self.working_dir);
    }

    /// Effective pidfile path
    pub fn pid_file(&self) -> PathBuf {
        self.pid_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/tmp/{}.pid", self.name)))
    }

    /// Effective log file path
    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/tmp/{}.log", self.name)))
    }

    /// Get run-loop interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Get stop poll interval as Duration
    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }

    /// Get stop timeout as Duration, if bounded
    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|e| {
        DaemonError::ConfigError(format!("Invalid value for {}: '{}' ({})", key, value, e))
    })
}

/// Expand `$VAR` and `${VAR}` in a string
fn expand_env_in_string(s: &str) -> String {
    let mut result = s.to_string();

    for (key, value) in std::env::vars() {
        result = result.replace(&format!("${{{}}}", key), &value);
        result = result.replace(&format!("${}", key), &value);
    }

    result
}

fn expand_env_in_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(expand_env_in_string(&path_str))
}
