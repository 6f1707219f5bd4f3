// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The consumer-facing event stream (C2): bounded, terminating exactly once,
//! safe for more than one consumer handle to pull from concurrently.
//!
//! Multi-consumer delivery is implemented as a single bounded
//! `tokio::sync::mpsc` channel whose receiving half is shared behind an
//! `Arc<tokio::sync::Mutex<..>>`; cloned [`EventStream`] handles race to pull
//! the next item rather than each seeing every item. That is the right
//! reading of "multi-consumer" here: this codebase has no fan-out broadcast
//! precedent, and callers of the Subagent Facade (C6) only ever hand the
//! stream to one active drainer at a time, with clones kept only to allow a
//! handoff between tasks. See DESIGN.md.
//!
//! `canceled` and non-fatal `error` items are ordinary, non-closing pushes:
//! per scenario 4 in the spec, a mid-stream cancel is followed by a
//! synthesized `Completed` and only then the stream's true terminator. Only
//! two calls ever close the stream: [`EventStreamProducer::finish`] (the
//! normal path, always emits `agent_end`) and
//! [`EventStreamProducer::finish_fatal`] (`SpawnFailed`/`SessionLocked`/
//! `SessionMismatch`/crash paths, which close with a bare `error` and no
//! `Completed` or `agent_end`, per §7's table).

use ar_core::{StreamItem, UnifiedEvent};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const DEFAULT_CAPACITY: usize = 256;

/// Producer-side handle. Owned by exactly one [`crate::runner::JsonlRunner`] task.
#[derive(Clone)]
pub struct EventStreamProducer {
    tx: mpsc::Sender<StreamItem>,
    terminated: Arc<AtomicBool>,
}

/// Error produced by `try_push` when the bounded queue is full.
#[derive(Debug, Clone, Copy)]
pub struct BackpressureDropped;

impl EventStreamProducer {
    fn new_pair() -> (Self, EventStream) {
        let (tx, rx) = mpsc::channel(DEFAULT_CAPACITY);
        let terminated = Arc::new(AtomicBool::new(false));
        (
            Self {
                tx,
                terminated: terminated.clone(),
            },
            EventStream {
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
                terminated,
            },
        )
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Blocking push of a `cli_event`: awaits channel capacity. Dropped
    /// silently if the stream already terminated.
    pub async fn push(&self, event: UnifiedEvent) {
        if self.is_terminated() {
            return;
        }
        let _ = self.tx.send(StreamItem::CliEvent(event)).await;
    }

    /// Nonblocking push. On a full queue, terminates the stream with
    /// `error(backpressure_dropped)` instead of silently dropping the item.
    pub fn try_push(&self, event: UnifiedEvent) -> Result<(), BackpressureDropped> {
        if self.is_terminated() {
            return Ok(());
        }
        match self.tx.try_send(StreamItem::CliEvent(event)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                if !self.terminated.swap(true, Ordering::SeqCst) {
                    let _ = self.tx.try_send(StreamItem::Error {
                        reason: "backpressure_dropped".to_string(),
                        partial: None,
                    });
                }
                Err(BackpressureDropped)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Ok(()),
        }
    }

    /// Non-closing `{canceled, reason}` item.
    pub async fn note_canceled(&self, reason: impl Into<String>) {
        if self.is_terminated() {
            return;
        }
        let _ = self
            .tx
            .send(StreamItem::Canceled {
                reason: reason.into(),
            })
            .await;
    }

    /// Non-closing `{error, reason, partial?}` item (e.g. `Timeout`, which is
    /// followed by a synthesized `Completed`).
    pub async fn note_error(&self, reason: impl Into<String>, partial: Option<String>) {
        if self.is_terminated() {
            return;
        }
        let _ = self
            .tx
            .send(StreamItem::Error {
                reason: reason.into(),
                partial,
            })
            .await;
    }

    /// The normal terminator: emits `{agent_end, meta}` and closes. No-op if
    /// already terminated.
    pub async fn finish(&self, meta: Option<Value>) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.tx.send(StreamItem::AgentEnd { meta }).await;
    }

    /// The fatal terminator: a bare `{error, reason, partial?}` with no
    /// `Completed` and no `agent_end` (`SpawnFailed`/`SessionLocked`/
    /// `SessionMismatch`/producer-crash paths). No-op if already terminated.
    pub async fn finish_fatal(&self, reason: impl Into<String>, partial: Option<String>) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self
            .tx
            .send(StreamItem::Error {
                reason: reason.into(),
                partial,
            })
            .await;
    }
}

/// Consumer-side handle. Clone to hand the stream to another task; clones
/// race for each item rather than each observing every item (see module docs).
#[derive(Clone)]
pub struct EventStream {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<StreamItem>>>,
    #[allow(dead_code)]
    terminated: Arc<AtomicBool>,
}

/// Error from a bounded consumer wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvTimeoutError {
    /// The bounded wait elapsed with no item available. Does not terminate
    /// the stream for other consumers.
    Elapsed,
    /// The producer is gone and the channel is drained.
    Closed,
}

impl EventStream {
    pub fn new_pair() -> (EventStreamProducer, EventStream) {
        EventStreamProducer::new_pair()
    }

    /// Pulls the next item, waiting indefinitely.
    pub async fn next(&self) -> Option<StreamItem> {
        self.rx.lock().await.recv().await
    }

    /// Pulls the next item, bounded by `timeout`. A timeout here is local to
    /// this call/consumer and does not affect the stream's terminal state.
    pub async fn next_timeout(&self, timeout: Duration) -> Result<StreamItem, RecvTimeoutError> {
        let mut guard = self.rx.lock().await;
        match tokio::time::timeout(timeout, guard.recv()).await {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(RecvTimeoutError::Closed),
            Err(_) => Err(RecvTimeoutError::Elapsed),
        }
    }

    /// Drains every remaining item. Convenience for tests and for C4's `run` helper.
    pub async fn drain(&self) -> Vec<StreamItem> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        items
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
