// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ar_runner::RunnerError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FacadeError {
    #[error("resume token is for engine {got}, this facade is for {expected}")]
    EngineMismatch { expected: String, got: String },

    #[error("session has no resume token yet; continue requires one")]
    NoResumeToken,

    #[error("run finished without a completed event")]
    NoTerminalEvent,

    #[error(transparent)]
    Runner(#[from] RunnerError),
}
