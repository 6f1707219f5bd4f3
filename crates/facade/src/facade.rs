// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Subagent Facade (C6): a per-engine convenience wrapper over C4's
//! `JsonlRunner`, so a caller says `claude.start(prompt, opts)` instead of
//! assembling a `RunnerOptions` and an `EngineAdapter` by hand.
//!
//! Tracing is folded directly into `start`/`resume`/`continue_session`/`run`
//! rather than through a separate decorator type: unlike the session/agent
//! adapters this workspace used to wrap with `TracedSession`/`TracedAgent`,
//! there is only ever one `Subagent` implementation per engine, so a second
//! "traced or not" variant would have nothing to decorate. Each method still
//! follows the same span-plus-elapsed-ms-plus-Ok/Err-branch convention those
//! wrappers used.

use crate::error::FacadeError;
use crate::event::{SimpleEvent, SimpleEventStream};
use crate::options::SubagentOptions;

use ar_core::{Clock, ResumeToken};
use ar_runner::{EngineAdapter, JsonlRunner, RunnerHandle};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// A running (or finished-but-not-yet-drained) subagent invocation.
pub struct SubagentSession {
    handle: RunnerHandle,
    token: Arc<Mutex<Option<ResumeToken>>>,
    cwd: Arc<Mutex<Option<PathBuf>>>,
}

impl SubagentSession {
    /// The lazily-pulled event sequence (C6 `events/1`).
    pub fn events(&self) -> SimpleEventStream {
        SimpleEventStream {
            inner: self.handle.stream(),
            token: self.token.clone(),
        }
    }

    /// The latest resume token observed on this session, updated as the
    /// event sequence is consumed (`started`, and `completed` when it
    /// carries one).
    pub fn resume_token(&self) -> Option<ResumeToken> {
        self.token.lock().clone()
    }

    /// Reduces the event sequence to the last `completed.answer` (C6
    /// `collect_answer/1`).
    pub async fn collect_answer(&self) -> Option<String> {
        self.events().collect_answer().await
    }

    pub async fn cancel(&self, reason: impl Into<String>) {
        self.handle.cancel(reason).await;
    }
}

/// One engine's facade: `adapter` is shared across every session it starts,
/// `runner` owns the session-lock registry those sessions race against.
pub struct Subagent<A: EngineAdapter, C: Clock> {
    runner: Arc<JsonlRunner<C>>,
    adapter: Arc<A>,
}

impl<A: EngineAdapter, C: Clock + 'static> Subagent<A, C> {
    pub fn new(runner: Arc<JsonlRunner<C>>, adapter: Arc<A>) -> Self {
        Self { runner, adapter }
    }

    pub fn engine(&self) -> &'static str {
        self.adapter.engine()
    }

    /// Starts a fresh session with no resume token.
    pub async fn start(
        &self,
        prompt: impl Into<String>,
        opts: SubagentOptions,
    ) -> Result<SubagentSession, FacadeError> {
        self.spawn(None, prompt, opts).await
    }

    /// Resumes a prior session. Fails fast if `token` belongs to a different
    /// engine than this facade.
    pub async fn resume(
        &self,
        token: ResumeToken,
        prompt: impl Into<String>,
        opts: SubagentOptions,
    ) -> Result<SubagentSession, FacadeError> {
        if token.engine != self.adapter.engine() {
            return Err(FacadeError::EngineMismatch {
                expected: self.adapter.engine().to_string(),
                got: token.engine,
            });
        }
        self.spawn(Some(token), prompt, opts).await
    }

    /// Continues `session` with a new prompt, reusing its resume token.
    /// Fails with [`FacadeError::NoResumeToken`] if none has been observed
    /// yet. Inherits the original session's `cwd` unless `opts` overrides it.
    pub async fn continue_session(
        &self,
        session: &SubagentSession,
        prompt: impl Into<String>,
        opts: Option<SubagentOptions>,
    ) -> Result<SubagentSession, FacadeError> {
        let token = session.resume_token().ok_or(FacadeError::NoResumeToken)?;
        let mut opts = opts.unwrap_or_default();
        if opts.cwd.is_none() {
            opts.cwd = session.cwd.lock().clone();
        }
        self.resume(token, prompt, opts).await
    }

    /// `start` plus `collect_answer`, with an optional callback observing
    /// every event along the way (C6 `run!/1`).
    pub async fn run(
        &self,
        prompt: impl Into<String>,
        opts: SubagentOptions,
        mut on_event: impl FnMut(&SimpleEvent),
    ) -> Result<String, FacadeError> {
        let span = tracing::info_span!("facade.run", engine = self.adapter.engine());
        async {
            let session = self.start(prompt, opts).await?;
            let events = session.events();
            let mut answer = None;
            while let Some(event) = events.next().await {
                on_event(&event);
                if let SimpleEvent::Completed { answer: a, .. } = &event {
                    answer = Some(a.clone());
                }
            }
            answer.ok_or(FacadeError::NoTerminalEvent)
        }
        .instrument(span)
        .await
    }

    async fn spawn(
        &self,
        token: Option<ResumeToken>,
        prompt: impl Into<String>,
        opts: SubagentOptions,
    ) -> Result<SubagentSession, FacadeError> {
        let engine = self.adapter.engine();
        let cwd = opts.cwd.clone();
        let owner = opts.owner.clone();
        let mut runner_options = opts.into_runner_options(prompt);
        if let Some(token) = token.clone() {
            runner_options = runner_options.resume(token);
        }

        let span = tracing::info_span!("facade.start", engine);
        let start = Instant::now();
        let result = self
            .runner
            .start(self.adapter.clone(), runner_options, owner)
            .instrument(span.clone())
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(parent: &span, elapsed_ms, "subagent started"),
            Err(err) => tracing::error!(parent: &span, elapsed_ms, error = %err, "subagent failed to start"),
        }
        let handle = result?;

        Ok(SubagentSession {
            handle,
            token: Arc::new(Mutex::new(token)),
            cwd: Arc::new(Mutex::new(cwd)),
        })
    }
}
