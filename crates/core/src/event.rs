// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unified event model shared by every engine adapter and consumer.
//!
//! An engine-agnostic view of a CLI agent's run: at most one [`UnifiedEvent::Started`],
//! any number of [`UnifiedEvent::Action`] lifecycle events, exactly one
//! [`UnifiedEvent::Completed`]. Adapters never construct these variants directly;
//! they go through an [`EventFactory`] so the engine name and the cached resume
//! token stay consistent across a run.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Identity of a resumable session: which engine, and the engine's own identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResumeToken {
    pub engine: String,
    pub value: String,
}

impl ResumeToken {
    pub fn new(engine: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            value: value.into(),
        }
    }
}

/// The category of a discrete side effect taken by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Command,
    Tool,
    FileChange,
    WebSearch,
    Subagent,
    Note,
    Turn,
    Warning,
    Telemetry,
}

/// Where an [`Action`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Started,
    Updated,
    Completed,
}

/// A discrete side effect attributed to the agent (a command run, a file edit, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub kind: ActionKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub detail: serde_json::Map<String, Value>,
}

impl Action {
    pub fn new(id: impl Into<String>, kind: ActionKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            detail: serde_json::Map::new(),
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Map<String, Value>) -> Self {
        self.detail = detail;
        self
    }
}

/// The tagged event a [`EventFactory`] produces and an adapter publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UnifiedEvent {
    #[serde(rename = "started")]
    Started {
        engine: String,
        resume: ResumeToken,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Value>,
    },
    #[serde(rename = "action")]
    Action {
        engine: String,
        action: Action,
        phase: Phase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ok: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<String>,
    },
    #[serde(rename = "completed")]
    Completed {
        engine: String,
        ok: bool,
        answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resume: Option<ResumeToken>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Value>,
    },
}

impl UnifiedEvent {
    /// Stable variant name, used in log lines and in `detail`/`meta` diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            UnifiedEvent::Started { .. } => "started",
            UnifiedEvent::Action { .. } => "action",
            UnifiedEvent::Completed { .. } => "completed",
        }
    }

    pub fn engine(&self) -> &str {
        match self {
            UnifiedEvent::Started { engine, .. }
            | UnifiedEvent::Action { engine, .. }
            | UnifiedEvent::Completed { engine, .. } => engine,
        }
    }

    /// One-line human summary, for `tracing` output. Never panics on any field shape.
    pub fn log_summary(&self) -> String {
        match self {
            UnifiedEvent::Started { engine, resume, .. } => {
                format!("{engine}: started (resume={})", resume.value)
            }
            UnifiedEvent::Action {
                engine,
                action,
                phase,
                ok,
                ..
            } => {
                format!(
                    "{engine}: action {:?} {:?} id={} title={:?} ok={:?}",
                    action.kind, phase, action.id, action.title, ok
                )
            }
            UnifiedEvent::Completed {
                engine, ok, error, ..
            } => {
                format!("{engine}: completed ok={ok} error={error:?}")
            }
        }
    }
}

/// One item delivered on a consumer-facing `EventStream`.
#[derive(Debug, Clone)]
pub enum StreamItem {
    CliEvent(UnifiedEvent),
    Canceled {
        reason: String,
    },
    Error {
        reason: String,
        partial: Option<String>,
    },
    AgentEnd {
        meta: Option<Value>,
    },
}

/// Errors raised while constructing events through an [`EventFactory`].
#[derive(Debug, Clone, Error)]
pub enum EventError {
    #[error("engine mismatch: factory is for {expected}, token is for {got}")]
    EngineMismatch { expected: String, got: String },
}

/// Stamps every event it produces with a fixed engine name and keeps the
/// current resume token so later `completed_*` calls can fall back to it.
///
/// Adapters never build [`UnifiedEvent`] variants by hand; they go through
/// one `EventFactory` owned by their `RunnerState` for the life of a run.
#[derive(Debug, Clone)]
pub struct EventFactory {
    engine: String,
    resume: Option<ResumeToken>,
    note_seq: u64,
}

impl EventFactory {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            resume: None,
            note_seq: 0,
        }
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn resume_token(&self) -> Option<&ResumeToken> {
        self.resume.as_ref()
    }

    /// Caches `token` on the factory and produces a `Started` event.
    ///
    /// Fails with [`EventError::EngineMismatch`] if `token.engine` disagrees
    /// with the engine this factory was stamped with.
    pub fn started(
        &mut self,
        token: ResumeToken,
        title: Option<String>,
        meta: Option<Value>,
    ) -> Result<UnifiedEvent, EventError> {
        if token.engine != self.engine {
            return Err(EventError::EngineMismatch {
                expected: self.engine.clone(),
                got: token.engine,
            });
        }
        self.resume = Some(token.clone());
        Ok(UnifiedEvent::Started {
            engine: self.engine.clone(),
            resume: token,
            title,
            meta,
        })
    }

    pub fn action(
        &self,
        id: impl Into<String>,
        kind: ActionKind,
        title: impl Into<String>,
        phase: Phase,
        ok: Option<bool>,
        detail: Option<serde_json::Map<String, Value>>,
    ) -> UnifiedEvent {
        UnifiedEvent::Action {
            engine: self.engine.clone(),
            action: Action {
                id: id.into(),
                kind,
                title: title.into(),
                detail: detail.unwrap_or_default(),
            },
            phase,
            ok,
            message: None,
            level: None,
        }
    }

    pub fn action_started(
        &self,
        id: impl Into<String>,
        kind: ActionKind,
        title: impl Into<String>,
        detail: Option<serde_json::Map<String, Value>>,
    ) -> UnifiedEvent {
        self.action(id, kind, title, Phase::Started, None, detail)
    }

    pub fn action_updated(
        &self,
        id: impl Into<String>,
        kind: ActionKind,
        title: impl Into<String>,
        detail: Option<serde_json::Map<String, Value>>,
    ) -> UnifiedEvent {
        self.action(id, kind, title, Phase::Updated, None, detail)
    }

    pub fn action_completed(
        &self,
        id: impl Into<String>,
        kind: ActionKind,
        title: impl Into<String>,
        ok: bool,
        detail: Option<serde_json::Map<String, Value>>,
    ) -> UnifiedEvent {
        self.action(id, kind, title, Phase::Completed, Some(ok), detail)
    }

    /// A one-off note, auto-numbered `note_<seq>`. Defaults to `kind = warning`
    /// so it stays visible across engines that would otherwise drop an unknown kind.
    pub fn note(
        &mut self,
        message: impl Into<String>,
        ok: Option<bool>,
        level: Option<String>,
    ) -> UnifiedEvent {
        let seq = self.note_seq;
        self.note_seq += 1;
        UnifiedEvent::Action {
            engine: self.engine.clone(),
            action: Action::new(format!("note_{seq}"), ActionKind::Warning, "note"),
            phase: Phase::Completed,
            ok,
            message: Some(message.into()),
            level,
        }
    }

    pub fn completed_ok(
        &self,
        answer: impl Into<String>,
        resume: Option<ResumeToken>,
        usage: Option<Value>,
    ) -> UnifiedEvent {
        UnifiedEvent::Completed {
            engine: self.engine.clone(),
            ok: true,
            answer: answer.into(),
            resume: resume.or_else(|| self.resume.clone()),
            error: None,
            usage,
        }
    }

    pub fn completed_error(
        &self,
        message: impl Into<String>,
        answer: Option<String>,
        resume: Option<ResumeToken>,
        usage: Option<Value>,
    ) -> UnifiedEvent {
        UnifiedEvent::Completed {
            engine: self.engine.clone(),
            ok: false,
            answer: answer.unwrap_or_default(),
            resume: resume.or_else(|| self.resume.clone()),
            error: Some(message.into()),
            usage,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
