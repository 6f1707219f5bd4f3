// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runner's error taxonomy (§7). Each kind is surfaced on the
//! [`crate::stream::EventStream`] exactly as its row in the spec's error table
//! describes; decode errors never reach this type (they're capped warnings).

use ar_core::ResumeToken;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RunnerError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("session locked: {0:?}")]
    SessionLocked(ResumeToken),

    #[error("session mismatch: expected {expected:?}, got {got:?}")]
    SessionMismatch {
        expected: ResumeToken,
        got: ResumeToken,
    },

    #[error("inactivity timeout")]
    Timeout,

    #[error("owner process is gone")]
    OwnerDown,

    #[error("runner task crashed: {0}")]
    RunnerCrashed(String),
}

impl RunnerError {
    /// The `{kind, ...}` reason tuple this error surfaces as on the stream (§7).
    pub fn reason(&self) -> String {
        match self {
            RunnerError::SpawnFailed(msg) => format!("spawn_failed: {msg}"),
            RunnerError::SessionLocked(token) => format!("session_locked: {token:?}"),
            RunnerError::SessionMismatch { expected, got } => {
                format!("session_mismatch: expected {expected:?}, got {got:?}")
            }
            RunnerError::Timeout => "timeout".to_string(),
            RunnerError::OwnerDown => "owner_down".to_string(),
            RunnerError::RunnerCrashed(msg) => format!("runner_crashed: {msg}"),
        }
    }
}

impl From<std::io::Error> for RunnerError {
    fn from(err: std::io::Error) -> Self {
        RunnerError::SpawnFailed(err.to_string())
    }
}
