use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Daemon paths isolated in a temporary directory
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    fn pid_file(&self) -> PathBuf {
        self.dir.path().join("daemonkit.pid")
    }

    fn log_file(&self) -> PathBuf {
        self.dir.path().join("daemonkit.log")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("daemonkit").expect("binary");
        cmd.env("DAEMONKIT_PID_FILE", self.pid_file())
            .env("DAEMONKIT_LOG_FILE", self.log_file())
            .env("DAEMONKIT_INTERVAL_SECS", "1")
            .env("DAEMONKIT_STOP_TIMEOUT_SECS", "20")
            .env_remove("DAEMONKIT_CONFIG")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    fn read_pid(&self) -> Option<u32> {
        fs::read_to_string(self.pid_file())
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    /// Wait for the detached daemon to record its pid
    fn wait_for_pid(&self) -> u32 {
        wait_until(|| self.read_pid()).expect("daemon never wrote its pidfile")
    }

    fn start(&self) -> u32 {
        self.cmd().arg("start").assert().success();
        self.wait_for_pid()
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if self.pid_file().exists() {
            let _ = self.cmd().arg("stop").output();
        }
    }
}

fn wait_until<T>(mut check: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Some(value) = check() {
            return Some(value);
        }
        sleep(Duration::from_millis(50));
    }
    None
}

fn alive(pid: u32) -> bool {
    let stat = match fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat,
        Err(_) => return Path::new(&format!("/proc/{}", pid)).exists(),
    };
    !stat.contains(") Z ")
}

#[test]
fn usage_errors_exit_2_without_touching_files() {
    let sandbox = Sandbox::new();

    sandbox.cmd().assert().code(2).stderr(contains("Usage"));
    sandbox.cmd().args(["start", "stop"]).assert().code(2);
    sandbox.cmd().arg("reload").assert().code(2);

    assert!(!sandbox.pid_file().exists());
    assert!(!sandbox.log_file().exists());
}

#[test]
fn stop_without_pidfile_succeeds() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .arg("stop")
        .assert()
        .success()
        .stdout(contains("not running"));

    assert!(!sandbox.pid_file().exists());
}

#[test]
fn status_without_pidfile_reports_not_running() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(contains("is not running"));
}

#[test]
fn start_records_detached_pid() {
    let sandbox = Sandbox::new();

    let pid = sandbox.start();

    let content = fs::read_to_string(sandbox.pid_file()).unwrap();
    assert_eq!(content, format!("{}\n", pid));
    assert!(alive(pid));

    sandbox
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(contains(format!("running with PID {}", pid)));

    // The daemon's stderr lands in the log file
    let logged = wait_until(|| {
        fs::read_to_string(sandbox.log_file())
            .ok()
            .filter(|log| log.contains("is running"))
    });
    assert!(logged.is_some());
}

#[test]
fn second_start_is_rejected() {
    let sandbox = Sandbox::new();

    sandbox.start();
    let before = fs::read_to_string(sandbox.pid_file()).unwrap();

    sandbox
        .cmd()
        .arg("start")
        .assert()
        .code(1)
        .stderr(contains("already running"));

    assert_eq!(fs::read_to_string(sandbox.pid_file()).unwrap(), before);
}

#[test]
fn stop_removes_pidfile() {
    let sandbox = Sandbox::new();

    let pid = sandbox.start();

    sandbox
        .cmd()
        .arg("stop")
        .assert()
        .success()
        .stdout(contains("stopped"));

    assert!(!sandbox.pid_file().exists());
    assert!(!alive(pid));

    sandbox
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(contains("is not running"));
}

#[test]
fn restart_records_new_pid() {
    let sandbox = Sandbox::new();

    let old_pid = sandbox.start();

    sandbox.cmd().arg("restart").assert().success();
    let new_pid = wait_until(|| sandbox.read_pid().filter(|pid| *pid != old_pid))
        .expect("restart never recorded a new pid");

    assert_ne!(old_pid, new_pid);
    assert!(!alive(old_pid));
    assert!(alive(new_pid));
}

#[test]
fn status_leaves_pidfile_untouched() {
    let sandbox = Sandbox::new();

    sandbox.start();
    let content = fs::read_to_string(sandbox.pid_file()).unwrap();
    let mtime = fs::metadata(sandbox.pid_file()).unwrap().modified().unwrap();

    sleep(Duration::from_millis(50));
    for _ in 0..3 {
        sandbox.cmd().arg("status").assert().success();
    }

    assert_eq!(fs::read_to_string(sandbox.pid_file()).unwrap(), content);
    assert_eq!(
        fs::metadata(sandbox.pid_file()).unwrap().modified().unwrap(),
        mtime
    );
}

#[test]
fn stale_pidfile_blocks_start_until_stopped() {
    let sandbox = Sandbox::new();

    let mut child = Command::new("true").spawn().unwrap();
    let dead_pid = child.id();
    child.wait().unwrap();
    fs::write(sandbox.pid_file(), format!("{}\n", dead_pid)).unwrap();

    sandbox
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Stale pidfile"));

    sandbox
        .cmd()
        .arg("start")
        .assert()
        .code(1)
        .stderr(contains("already running"));

    sandbox.cmd().arg("stop").assert().success();
    assert!(!sandbox.pid_file().exists());

    let pid = sandbox.start();
    assert_ne!(pid, dead_pid);
}

#[test]
fn run_in_foreground_cleans_up_on_sigterm() {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let sandbox = Sandbox::new();

    let mut child = sandbox
        .cmd()
        .arg("run")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let pid = child.id();

    // No detach: the pidfile records the spawned process itself
    let recorded = wait_until(|| sandbox.read_pid().filter(|p| *p == pid));
    assert_eq!(recorded, Some(pid));

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).unwrap();

    let exit = child.wait().unwrap();
    assert!(exit.success());
    assert!(!sandbox.pid_file().exists());
}

#[test]
fn invalid_config_is_reported() {
    let sandbox = Sandbox::new();
    let config = sandbox.dir.path().join("daemon.toml");
    fs::write(&config, "interval_secs = 0\n").unwrap();

    sandbox
        .cmd()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .env_remove("DAEMONKIT_INTERVAL_SECS")
        .assert()
        .code(1)
        .stderr(contains("interval_secs"));
}
