// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner-process liveness monitoring for cascading shutdown (§4.4, §7 `OwnerDown`).

use async_trait::async_trait;

/// An opaque owner identity the runner polls for liveness.
#[async_trait]
pub trait OwnerMonitor: Send + Sync + 'static {
    /// Returns `true` while the owner is still around.
    async fn is_alive(&self) -> bool;
}

/// Default monitor for callers with no owner process to track.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAlive;

#[async_trait]
impl OwnerMonitor for AlwaysAlive {
    async fn is_alive(&self) -> bool {
        true
    }
}

/// Polls whether a unix process id is still alive via a zero-signal `kill`.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct PidOwnerMonitor {
    pub pid: u32,
}

#[cfg(unix)]
#[async_trait]
impl OwnerMonitor for PidOwnerMonitor {
    async fn is_alive(&self) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        kill(Pid::from_raw(self.pid as i32), None).is_ok()
    }
}
