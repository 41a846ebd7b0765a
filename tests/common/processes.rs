//! Process liveness checks for tests that kill process trees

#![allow(dead_code)]

use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Script that starts a long-running subprocess, prints its pid and waits.
pub const SPAWNS_SUBPROCESS: &str = "sleep 30 & echo $!; wait";

/// Whether `pid` still runs. Zombies count as gone: nothing may reap them
/// inside a container.
pub fn is_running(pid: &str) -> bool {
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

pub fn exits_within(pid: &str, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if !is_running(pid) {
            return true;
        }
        thread::sleep(Duration::from_millis(25));
    }
    false
}
