// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The JSONL runner (C4): owns one subprocess end to end, through
//! `SPAWNING -> STREAMING -> DRAINING/KILLING -> FINALIZED`.
//!
//! One `tokio::spawn`'d task per run, built around a single `tokio::select!`
//! over the stdout chunk read, the child's exit, the inactivity timer, the
//! cancel-grace timer, the owner-liveness poll, and the cancel-request
//! channel. The whole task runs inside a `tracing::info_span!("runner", ...)`.

use crate::adapter::{EngineAdapter, RunnerOptions};
use crate::error::RunnerError;
use crate::kill;
use crate::line_buffer::LineBuffer;
use crate::lock::{RunnerIdentity, SessionLockRegistry};
use crate::owner::OwnerMonitor;
use crate::stream::{EventStream, EventStreamProducer};

use ar_core::{
    Action, ActionKind, Clock, IdGen, Phase, ResumeToken, RunnerId, StreamItem, UnifiedEvent,
    UuidIdGen,
};
use std::io::Read as _;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::Instrument;

const MAX_DECODE_WARNINGS: usize = 3;
const STDERR_TAIL_BYTES: usize = 2048;
const OWNER_POLL_INTERVAL: Duration = Duration::from_millis(500);
const READ_CHUNK: usize = 8192;

/// Handed back to the caller by [`JsonlRunner::start`].
pub struct RunnerHandle {
    stream: EventStream,
    cancel_tx: mpsc::Sender<String>,
}

impl RunnerHandle {
    pub fn stream(&self) -> EventStream {
        self.stream.clone()
    }

    /// Requests cooperative cancellation. A no-op if the run already finished
    /// or a cancel is already in flight.
    pub async fn cancel(&self, reason: impl Into<String>) {
        let _ = self.cancel_tx.send(reason.into()).await;
    }
}

/// Owns the session-lock registry shared across every run it starts.
pub struct JsonlRunner<C: Clock> {
    registry: Arc<SessionLockRegistry<C>>,
}

impl<C: Clock + 'static> JsonlRunner<C> {
    pub fn new(clock: C) -> Self {
        Self {
            registry: Arc::new(SessionLockRegistry::new(clock)),
        }
    }

    pub fn registry(&self) -> Arc<SessionLockRegistry<C>> {
        self.registry.clone()
    }

    /// Starts one run. If `options.resume` is set, the session lock is
    /// acquired before the subprocess is ever spawned; a contended lock never
    /// touches the process table.
    pub async fn start<A: EngineAdapter>(
        &self,
        adapter: Arc<A>,
        options: RunnerOptions,
        owner: Arc<dyn OwnerMonitor>,
    ) -> Result<RunnerHandle, RunnerError> {
        let identity = RunnerIdentity::new(RunnerId::new(UuidIdGen.next()));

        if let Some(token) = options.resume.clone() {
            self.registry.acquire(&token, identity.clone())?;
        }

        let (producer, consumer) = EventStream::new_pair();
        let (cancel_tx, cancel_rx) = mpsc::channel(1);

        let registry = self.registry.clone();
        let engine = adapter.engine();
        let span = tracing::info_span!("runner", engine, runner_id = %identity.id);
        tokio::spawn(
            run_task(adapter, options, producer, cancel_rx, owner, registry, identity)
                .instrument(span),
        );

        Ok(RunnerHandle {
            stream: consumer,
            cancel_tx,
        })
    }

    /// Convenience for callers that just want every item, in order, once the
    /// run is over. Equivalent to `start(..).stream().drain()`.
    pub async fn run<A: EngineAdapter>(
        &self,
        adapter: Arc<A>,
        options: RunnerOptions,
        owner: Arc<dyn OwnerMonitor>,
    ) -> Vec<StreamItem> {
        match self.start(adapter, options, owner).await {
            Ok(handle) => handle.stream().drain().await,
            Err(err) => {
                let (tx, rx) = EventStream::new_pair();
                tx.finish_fatal(err.reason(), None).await;
                rx.drain().await
            }
        }
    }
}

/// Per-run session bookkeeping the runner itself owns, distinct from the
/// adapter's opaque `State`: Started-event policing only needs to look at the
/// concrete [`UnifiedEvent`]s an adapter emits, never its internal state.
struct SessionTracking {
    resume_requested: Option<ResumeToken>,
    observed: Option<ResumeToken>,
    lock_held: bool,
    done: bool,
}

impl SessionTracking {
    fn new(resume_requested: Option<ResumeToken>) -> Self {
        Self {
            lock_held: resume_requested.is_some(),
            resume_requested,
            observed: None,
            done: false,
        }
    }
}

enum SessionCheck {
    Ok,
    Mismatch { expected: ResumeToken, got: ResumeToken },
    NeedsLock(ResumeToken),
}

fn check_session(tracking: &mut SessionTracking, candidate: &ResumeToken) -> SessionCheck {
    if let Some(expected) = tracking.resume_requested.clone() {
        if &expected != candidate {
            return SessionCheck::Mismatch {
                expected,
                got: candidate.clone(),
            };
        }
        return SessionCheck::Ok;
    }
    match tracking.observed.clone() {
        Some(observed) if &observed != candidate => SessionCheck::Mismatch {
            expected: observed,
            got: candidate.clone(),
        },
        Some(_) => SessionCheck::Ok,
        None => {
            tracking.observed = Some(candidate.clone());
            SessionCheck::NeedsLock(candidate.clone())
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_task<A: EngineAdapter, C: Clock>(
    adapter: Arc<A>,
    options: RunnerOptions,
    stream: EventStreamProducer,
    mut cancel_rx: mpsc::Receiver<String>,
    owner: Arc<dyn OwnerMonitor>,
    registry: Arc<SessionLockRegistry<C>>,
    identity: RunnerIdentity,
) {
    let mut tracking = SessionTracking::new(options.resume.clone());
    let mut state = adapter.init_state(&options.prompt, options.resume.as_ref());

    let (exe, argv) = adapter.build_command(&options.prompt, options.resume.as_ref(), &state);
    let stdin_payload = adapter.stdin_payload(&options.prompt, options.resume.as_ref(), &state);
    let adapter_env = adapter.env(&state).unwrap_or_default();

    let stderr_file = match tempfile::tempfile() {
        Ok(f) => f,
        Err(err) => {
            release_if_held(&registry, &tracking, &identity);
            stream
                .finish_fatal(RunnerError::SpawnFailed(err.to_string()).reason(), None)
                .await;
            return;
        }
    };
    let stderr_for_child = match stderr_file.try_clone() {
        Ok(f) => f,
        Err(err) => {
            release_if_held(&registry, &tracking, &identity);
            stream
                .finish_fatal(RunnerError::SpawnFailed(err.to_string()).reason(), None)
                .await;
            return;
        }
    };

    let mut cmd = Command::new(&exe);
    cmd.args(&argv);
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in options.env.iter().cloned().chain(adapter_env) {
        cmd.env(key, value);
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::from(stderr_for_child));
    cmd.stdin(if stdin_payload.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            release_if_held(&registry, &tracking, &identity);
            stream
                .finish_fatal(RunnerError::from(err).reason(), None)
                .await;
            return;
        }
    };

    let pid = child.id().unwrap_or(0);

    if let Some(payload) = stdin_payload {
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(&payload).await;
        }
    }
    let mut stdout = match child.stdout.take() {
        Some(out) => out,
        None => {
            release_if_held(&registry, &tracking, &identity);
            stream
                .finish_fatal(RunnerError::SpawnFailed("no stdout pipe".to_string()).reason(), None)
                .await;
            return;
        }
    };

    let mut line_buffer = LineBuffer::new();
    let mut read_buf = [0u8; READ_CHUNK];
    let mut stdout_open = true;

    let mut timeout_deadline = options.timeout.map(|d| Instant::now() + d);
    let mut grace_deadline: Option<Instant> = None;
    let mut killing = false;
    let mut cancel_sent = false;
    let mut decode_warnings = 0usize;

    let exit_status = loop {
        let timeout_sleep = sleep_until_opt(timeout_deadline);
        let grace_sleep = sleep_until_opt(grace_deadline);
        let owner_poll = tokio::time::sleep(OWNER_POLL_INTERVAL);

        tokio::select! {
            biased;

            Some(reason) = cancel_rx.recv(), if !cancel_sent && !killing => {
                cancel_sent = true;
                stream.note_canceled(reason).await;
                kill::send_term(pid);
                grace_deadline = Some(Instant::now() + options.cancel_grace);
            }

            status = child.wait() => {
                break status;
            }

            read_result = stdout.read(&mut read_buf), if stdout_open && !killing => {
                match read_result {
                    Ok(0) => {
                        stdout_open = false;
                    }
                    Ok(n) => {
                        if timeout_deadline.is_some() {
                            timeout_deadline = options.timeout.map(|d| Instant::now() + d);
                        }
                        let lines = line_buffer.push(&read_buf[..n]);
                        for line in lines {
                            if line.trim().is_empty() {
                                continue;
                            }
                            if !handle_line(
                                &*adapter,
                                &mut state,
                                &line,
                                &stream,
                                &mut tracking,
                                &registry,
                                &identity,
                                &mut decode_warnings,
                            )
                            .await
                            {
                                kill::send_kill(pid);
                                killing = true;
                            }
                        }
                    }
                    Err(_) => {
                        stdout_open = false;
                    }
                }
            }

            _ = timeout_sleep, if timeout_deadline.is_some() && !killing && !cancel_sent => {
                cancel_sent = true;
                stream.note_error(RunnerError::Timeout.reason(), None).await;
                kill::send_kill(pid);
                killing = true;
            }

            _ = grace_sleep, if grace_deadline.is_some() => {
                kill::send_kill(pid);
                killing = true;
                grace_deadline = None;
            }

            _ = owner_poll, if !killing && !cancel_sent => {
                if !owner.is_alive().await {
                    cancel_sent = true;
                    stream.note_canceled(RunnerError::OwnerDown.reason()).await;
                    kill::send_kill(pid);
                    killing = true;
                }
            }
        }
    };

    release_if_held(&registry, &tracking, &identity);

    if !tracking.done {
        let events = match exit_status {
            Ok(status) if status.success() => adapter.handle_stream_end(&mut state),
            Ok(status) => {
                let exit_code = status.code().unwrap_or(-1);
                if let Some(tail) = stderr_tail(&stderr_file, exit_code) {
                    stream.push(stderr_note(adapter.engine(), tail)).await;
                }
                adapter.handle_exit_error(exit_code, &mut state)
            }
            Err(_) => adapter.handle_exit_error(-1, &mut state),
        };
        for event in events {
            stream.push(event).await;
        }
    }

    stream.finish(None).await;
}

/// Decodes and translates one line. Returns `false` if the run must be torn
/// down immediately (session mismatch or lock contention).
#[allow(clippy::too_many_arguments)]
async fn handle_line<A: EngineAdapter, C: Clock>(
    adapter: &A,
    state: &mut A::State,
    line: &str,
    stream: &EventStreamProducer,
    tracking: &mut SessionTracking,
    registry: &Arc<SessionLockRegistry<C>>,
    identity: &RunnerIdentity,
    decode_warnings: &mut usize,
) -> bool {
    let decoded = match adapter.decode_line(line) {
        Ok(Some(decoded)) => decoded,
        Ok(None) => return true,
        Err(err) => {
            if *decode_warnings < MAX_DECODE_WARNINGS {
                *decode_warnings += 1;
                tracing::warn!(error = %err, "adapter failed to decode line");
                stream.push(decode_warning_note(adapter.engine())).await;
            }
            return true;
        }
    };

    let (events, outcome) = adapter.translate_event(decoded, state);

    let mut candidates: Vec<ResumeToken> = Vec::new();
    for event in &events {
        if let UnifiedEvent::Started { resume, .. } = event {
            candidates.push(resume.clone());
        }
        if matches!(event, UnifiedEvent::Completed { .. }) {
            tracking.done = true;
        }
    }
    if let Some(found) = &outcome.found_session {
        candidates.push(found.clone());
    }
    if outcome.done {
        tracking.done = true;
    }

    for candidate in candidates {
        match check_session(tracking, &candidate) {
            SessionCheck::Ok => {}
            SessionCheck::Mismatch { expected, got } => {
                stream
                    .finish_fatal(
                        RunnerError::SessionMismatch { expected, got }.reason(),
                        None,
                    )
                    .await;
                return false;
            }
            SessionCheck::NeedsLock(token) => match registry.acquire(&token, identity.clone()) {
                Ok(()) => tracking.lock_held = true,
                Err(err) => {
                    stream.finish_fatal(err.reason(), None).await;
                    return false;
                }
            },
        }
    }

    for event in events {
        stream.push(event).await;
    }
    true
}

fn release_if_held<C: Clock>(
    registry: &Arc<SessionLockRegistry<C>>,
    tracking: &SessionTracking,
    identity: &RunnerIdentity,
) {
    if !tracking.lock_held {
        return;
    }
    let token = tracking
        .resume_requested
        .clone()
        .or_else(|| tracking.observed.clone());
    if let Some(token) = token {
        registry.release(&token, identity);
    }
}

fn sleep_until_opt(deadline: Option<Instant>) -> tokio::time::Sleep {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline),
        None => tokio::time::sleep_until(Instant::now() + Duration::from_secs(3600 * 24 * 365)),
    }
}

/// Reads the last `STDERR_TAIL_BYTES` of the child's stderr sink. Returns
/// `None` when the sink is empty — the uniform stderr `note` (see
/// `stderr_note`) is only emitted when there is something to show.
fn stderr_tail(file: &std::fs::File, exit_code: i32) -> Option<String> {
    use std::io::{Seek, SeekFrom};
    // `Read`/`Seek` are implemented for `&File` directly; no clone needed.
    let mut file = file;
    let len = file.seek(SeekFrom::End(0)).unwrap_or(0);
    let start = len.saturating_sub(STDERR_TAIL_BYTES as u64);
    if file.seek(SeekFrom::Start(start)).is_err() {
        return None;
    }
    let mut buf = Vec::new();
    if file.read_to_end(&mut buf).is_ok() && !buf.is_empty() {
        let text = String::from_utf8_lossy(&buf).to_string();
        tracing::warn!(exit_code, stderr_tail = %text, "child exited with a nonzero status");
        Some(text)
    } else {
        None
    }
}

/// At most `MAX_DECODE_WARNINGS` of these are pushed per run (P7): a
/// malformed line never raises, but it is not silently invisible either.
fn decode_warning_note(engine: &str) -> UnifiedEvent {
    UnifiedEvent::Action {
        engine: engine.to_string(),
        action: Action::new("decode_warning", ActionKind::Warning, "Invalid JSONL line"),
        phase: Phase::Completed,
        ok: Some(false),
        message: None,
        level: Some("warning".to_string()),
    }
}

/// The uniform "stderr output" note every adapter gets for free on an
/// abnormal exit with non-empty stderr (applies regardless of engine, since
/// the spawning contract captures stderr identically for all of them).
fn stderr_note(engine: &str, tail: String) -> UnifiedEvent {
    UnifiedEvent::Action {
        engine: engine.to_string(),
        action: Action::new("stderr", ActionKind::Warning, "stderr output"),
        phase: Phase::Completed,
        ok: Some(false),
        message: Some(tail),
        level: Some("warning".to_string()),
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
