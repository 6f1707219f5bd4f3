// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-group kill semantics. On unix both group-kill and single-PID kill
//! are attempted to handle shells that don't set a process group (§9); on
//! windows a native tree-kill is used.

#[cfg(unix)]
pub fn send_term(pid: u32) {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;
    let nix_pid = Pid::from_raw(pid as i32);
    let _ = killpg(nix_pid, Signal::SIGTERM);
    let _ = kill(nix_pid, Signal::SIGTERM);
}

#[cfg(unix)]
pub fn send_kill(pid: u32) {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;
    let nix_pid = Pid::from_raw(pid as i32);
    let _ = killpg(nix_pid, Signal::SIGKILL);
    let _ = kill(nix_pid, Signal::SIGKILL);
}

#[cfg(windows)]
pub fn send_term(pid: u32) {
    // Windows has no graceful-signal equivalent for console subprocesses;
    // tree-kill is the best available approximation.
    send_kill(pid);
}

#[cfg(windows)]
pub fn send_kill(pid: u32) {
    let _ = std::process::Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .output();
}
