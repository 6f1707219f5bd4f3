// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The facade's consumer-facing event shape (C6): a flat-mapped view of
//! [`ar_core::UnifiedEvent`]/[`ar_core::StreamItem`] with `agent_end` filtered
//! out, since the facade's own terminators (`collect_answer` returning, the
//! stream drying up) already tell a caller the run is over.

use ar_core::{Action, Phase, ResumeToken};
use std::sync::Arc;

/// One item handed to a facade caller. Mirrors the tuple shapes of C6's
/// `events/1`: `(started, token)`, `(action, ..)`, `(completed, ..)`,
/// `(error, reason)` — the last one standing in for both a raw `error` item
/// and a `canceled` item, since from a caller's point of view both just mean
/// "the run did not reach its own terminal event cleanly".
#[derive(Debug, Clone)]
pub enum SimpleEvent {
    Started {
        resume: ResumeToken,
        title: Option<String>,
    },
    Action {
        action: Action,
        phase: Phase,
        ok: Option<bool>,
        message: Option<String>,
        level: Option<String>,
    },
    Completed {
        ok: bool,
        answer: String,
        resume: Option<ResumeToken>,
        error: Option<String>,
    },
    Error {
        reason: String,
    },
}

impl SimpleEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimpleEvent::Completed { .. } | SimpleEvent::Error { .. })
    }
}

/// The lazily-pulled sequence `events/1` returns. Each [`Self::next`] call
/// updates the session's shared resume-token tracker exactly as C6 specifies:
/// on a `started` item always, on a `completed` item only when it carries a
/// resume token of its own.
pub struct SimpleEventStream {
    pub(crate) inner: ar_runner::EventStream,
    pub(crate) token: Arc<parking_lot::Mutex<Option<ResumeToken>>>,
}

impl SimpleEventStream {
    pub async fn next(&self) -> Option<SimpleEvent> {
        loop {
            match self.inner.next().await? {
                ar_core::StreamItem::CliEvent(ar_core::UnifiedEvent::Started {
                    resume,
                    title,
                    ..
                }) => {
                    *self.token.lock() = Some(resume.clone());
                    return Some(SimpleEvent::Started { resume, title });
                }
                ar_core::StreamItem::CliEvent(ar_core::UnifiedEvent::Action {
                    action,
                    phase,
                    ok,
                    message,
                    level,
                    ..
                }) => {
                    return Some(SimpleEvent::Action {
                        action,
                        phase,
                        ok,
                        message,
                        level,
                    });
                }
                ar_core::StreamItem::CliEvent(ar_core::UnifiedEvent::Completed {
                    ok,
                    answer,
                    resume,
                    error,
                    ..
                }) => {
                    if let Some(resume) = &resume {
                        *self.token.lock() = Some(resume.clone());
                    }
                    return Some(SimpleEvent::Completed {
                        ok,
                        answer,
                        resume,
                        error,
                    });
                }
                ar_core::StreamItem::Canceled { reason } => {
                    return Some(SimpleEvent::Error {
                        reason: format!("canceled: {reason}"),
                    });
                }
                ar_core::StreamItem::Error { reason, .. } => {
                    return Some(SimpleEvent::Error { reason });
                }
                ar_core::StreamItem::AgentEnd { .. } => return None,
            }
        }
    }

    /// Drains the whole sequence. Mostly useful for tests; real callers
    /// usually want `collect_answer` or to drive `next` in their own loop.
    pub async fn drain(&self) -> Vec<SimpleEvent> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item);
        }
        items
    }

    /// Reduces the sequence to the last `completed.answer`, matching C6's
    /// `collect_answer/1`.
    pub async fn collect_answer(&self) -> Option<String> {
        let mut answer = None;
        while let Some(item) = self.next().await {
            if let SimpleEvent::Completed { answer: a, .. } = item {
                answer = Some(a);
            }
        }
        answer
    }
}
