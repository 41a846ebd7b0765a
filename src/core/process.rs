//! Bounded execution of short-lived package-manager commands.
//!
//! Output streams are drained on reader threads while the caller polls the
//! child, so a chatty process cannot fill its pipe and stall. A child still
//! running at the deadline is killed and reaped.
//!
//! On Unix every command runs as the leader of its own process group, and
//! termination signals the whole group: pip spawns build backends and
//! isolated installs that must not outlive a killed job.

use crate::core::error::{PipPilotError, Result};
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

pub const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long [`terminate`] waits for a killed process group to disappear.
const GROUP_EXIT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout and stderr joined, for error reports
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, _) => stderr.to_string(),
            (false, true) => stdout.to_string(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

pub fn program_name(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}

/// Run `command` to completion, capturing its output, within `timeout`.
pub fn run_captured(mut command: Command, timeout: Duration) -> Result<CapturedOutput> {
    let program = program_name(&command);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    isolate(&mut command);

    log::debug!("Running {command:?} (timeout {}s)", timeout.as_secs());
    let mut child = command.spawn()?;
    let stdout_handle = child.stdout.take().map(|out| thread::spawn(move || read_all(out)));
    let stderr_handle = child.stderr.take().map(|err| thread::spawn(move || read_all(err)));

    let status = match wait_with_deadline(&mut child, Instant::now() + timeout)? {
        Some(status) => status,
        None => {
            terminate(&mut child, &program);
            return Err(PipPilotError::process_timeout(program, timeout.as_secs()));
        }
    };

    Ok(CapturedOutput {
        code: status.code(),
        stdout: join_reader(stdout_handle),
        stderr: join_reader(stderr_handle),
    })
}

/// Poll `child` until it exits or `deadline` passes. `None` means still running.
pub fn wait_with_deadline(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Start `command` in a new process group so [`terminate`] can reach its
/// descendants.
#[cfg(unix)]
pub fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(unix))]
pub fn isolate(_command: &mut Command) {}

/// Kill a child together with its process group, then reap it. Errors are
/// logged: the child may already be gone.
pub fn terminate(child: &mut Child, program: &str) {
    kill_tree(child, program);
    match child.wait() {
        Ok(status) => log::debug!("{program} (pid {}) terminated: {status}", child.id()),
        Err(e) => log::warn!("Could not reap {program} (pid {}): {e}", child.id()),
    }
    wait_for_group_exit(child, program);
}

#[cfg(unix)]
fn kill_tree(child: &mut Child, program: &str) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(child.id()) else {
        kill_child(child, program);
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => {}
        Err(Errno::ESRCH) => log::debug!("Process group of {program} (pid {raw}) already gone"),
        Err(e) => {
            log::warn!("Could not kill process group of {program} (pid {raw}): {e}");
            kill_child(child, program);
        }
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child, program: &str) {
    kill_child(child, program);
}

/// Block until no member of the child's process group is left, bounded by
/// [`GROUP_EXIT_TIMEOUT`]. Members may linger as zombies until their new
/// parent reaps them.
#[cfg(unix)]
fn wait_for_group_exit(child: &Child, program: &str) {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(child.id()) else {
        return;
    };
    let deadline = Instant::now() + GROUP_EXIT_TIMEOUT;
    while killpg(Pid::from_raw(raw), None).is_ok() {
        if Instant::now() >= deadline {
            log::debug!("Process group of {program} (pid {raw}) still has members");
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(not(unix))]
fn wait_for_group_exit(_child: &Child, _program: &str) {}

fn kill_child(child: &mut Child, program: &str) {
    if let Err(e) = child.kill() {
        log::debug!("Kill of {program} (pid {}) failed: {e}", child.id());
    }
}

/// Forward every line of `stream` to `on_line`, stripping line terminators.
/// Invalid UTF-8 is replaced rather than aborting the stream.
pub fn for_each_line<R: Read>(stream: R, mut on_line: impl FnMut(String) -> bool) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if !on_line(line.trim_end_matches(['\n', '\r']).to_string()) {
                    break;
                }
            }
            Err(e) => {
                log::debug!("Output stream closed with error: {e}");
                break;
            }
        }
    }
}

fn read_all<R: Read>(stream: R) -> String {
    let mut out = String::new();
    for_each_line(stream, |line| {
        out.push_str(&line);
        out.push('\n');
        true
    });
    out
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.args(["-c", script]);
        command
    }

    #[test]
    fn test_captures_stdout_and_exit_code() -> Result<()> {
        let output = run_captured(sh("echo hello; echo oops >&2; exit 3"), Duration::from_secs(5))?;
        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
        assert_eq!(output.combined(), "hello\noops");
        Ok(())
    }

    #[test]
    fn test_timeout_kills_child() {
        let started = Instant::now();
        let result = run_captured(sh("exec sleep 10"), Duration::from_millis(200));
        match result {
            Err(PipPilotError::ProcessTimeout { program, .. }) => assert_eq!(program, "sh"),
            other => panic!("Expected ProcessTimeout, got: {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_kills_whole_process_group() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let pid_file = temp_dir.path().join("worker.pid");
        let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());

        let result = run_captured(sh(&script), Duration::from_millis(500));
        assert!(matches!(result, Err(PipPilotError::ProcessTimeout { .. })));

        let pid = std::fs::read_to_string(&pid_file)?.trim().to_string();
        assert!(exits_within(&pid, Duration::from_secs(5)), "pid {pid} survived");
        Ok(())
    }

    fn exits_within(pid: &str, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if !is_running(pid) {
                return true;
            }
            thread::sleep(POLL_INTERVAL);
        }
        false
    }

    /// Zombies count as gone: nothing may reap them inside a container.
    fn is_running(pid: &str) -> bool {
        if cfg!(target_os = "linux") {
            return match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
                Ok(stat) => stat
                    .rsplit(')')
                    .next()
                    .is_some_and(|rest| !rest.trim_start().starts_with('Z')),
                Err(_) => false,
            };
        }
        Command::new("kill")
            .args(["-0", pid])
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let result = run_captured(
            Command::new("/non/existent/pip-pilot-binary"),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(PipPilotError::Io(_))));
    }

    #[test]
    fn test_for_each_line_strips_terminators() {
        let mut lines = Vec::new();
        for_each_line("one\r\ntwo\nthree".as_bytes(), |line| {
            lines.push(line);
            true
        });
        assert_eq!(lines, vec!["one", "two", "three"]);
    }
}
