// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine callback protocol (C5's extension point) and the options a
//! caller supplies to [`crate::runner::JsonlRunner::start`].

use ar_core::{ResumeToken, UnifiedEvent};
use std::path::PathBuf;
use std::time::Duration;

/// Caller-supplied inputs to a single run. `timeout` defaults to 10 minutes;
/// `None` means infinite. Empty stdout chunks MUST NOT reset the inactivity timer.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub prompt: String,
    pub resume: Option<ResumeToken>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub cancel_grace: Duration,
}

impl RunnerOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            resume: None,
            cwd: None,
            env: Vec::new(),
            timeout: Some(Duration::from_secs(600)),
            cancel_grace: Duration::from_millis(1000),
        }
    }

    pub fn resume(mut self, token: ResumeToken) -> Self {
        self.resume = Some(token);
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }
}

/// Extra signals a `translate_event` call can surface alongside its events.
#[derive(Debug, Clone, Default)]
pub struct TranslateOutcome {
    /// A session identifier newly observed in this line, if any.
    pub found_session: Option<ResumeToken>,
    /// Set when this line carried the session's terminal translated event.
    pub done: bool,
}

/// Errors a `decode_line` call can report. Never fatal to the run; see §7/P7.
#[derive(Debug, Clone)]
pub struct DecodeError(pub String);

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One engine's implementation of the callback protocol. `State` is opaque to
/// the runner: it accumulates whatever the adapter needs across lines
/// (an [`ar_core::EventFactory`], a pending-actions map, turn counters, ...).
///
/// Every method here runs on the runner's task and MUST be non-blocking,
/// bounded-time, and free of I/O beyond pure CPU decoding (§5).
pub trait EngineAdapter: Send + Sync + 'static {
    /// Opaque per-run accumulator. Constructed once by `init_state`.
    type State: Send;
    /// Whatever `decode_line` extracts from one line, handed to `translate_event`.
    type Decoded: Send;

    /// Stable, lower-case identifier (`"codex"`, `"claude"`, ...).
    fn engine(&self) -> &'static str;

    /// Pure. Must not do I/O beyond optional config already loaded into `self`.
    fn init_state(&self, prompt: &str, resume: Option<&ResumeToken>) -> Self::State;

    /// Deterministic given inputs. May drop empty `--model` flags and append
    /// config-derived extra args.
    fn build_command(
        &self,
        prompt: &str,
        resume: Option<&ResumeToken>,
        state: &Self::State,
    ) -> (String, Vec<String>);

    /// If `Some`, written to the child's stdin once, then stdin is closed.
    fn stdin_payload(
        &self,
        prompt: &str,
        resume: Option<&ResumeToken>,
        state: &Self::State,
    ) -> Option<Vec<u8>> {
        let _ = (prompt, resume, state);
        None
    }

    /// Env overlay applied on top of the caller's extras. `None` means "no overlay".
    fn env(&self, state: &Self::State) -> Option<Vec<(String, String)>> {
        let _ = state;
        None
    }

    /// Pure. `Ok(None)` means "ignored, skip silently"; `Err` is a decode failure (never fatal).
    fn decode_line(&self, line: &str) -> Result<Option<Self::Decoded>, DecodeError>;

    /// Pure. Produces zero or more unified events plus any session/done signals.
    fn translate_event(
        &self,
        data: Self::Decoded,
        state: &mut Self::State,
    ) -> (Vec<UnifiedEvent>, TranslateOutcome);

    /// Produces at least a terminal `Completed` for a nonzero exit code.
    fn handle_exit_error(&self, exit_code: i32, state: &mut Self::State) -> Vec<UnifiedEvent>;

    /// Produces at least a terminal `Completed` when the child exited 0 but
    /// never emitted one itself.
    fn handle_stream_end(&self, state: &mut Self::State) -> Vec<UnifiedEvent>;
}
