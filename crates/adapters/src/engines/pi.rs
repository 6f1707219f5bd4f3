// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pi adapter. Pi has no JSON wire format at all: it prints plain-text
//! marker lines prefixed with `>>`. Everything else in this crate assumes a
//! JSON `Decoded` type, so `decode_line` here does the equivalent job with a
//! small line-oriented grammar instead of `serde_json`.

use ar_core::{ActionKind, EventFactory, ResumeToken, UnifiedEvent};
use ar_runner::{DecodeError, EngineAdapter, TranslateOutcome};
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

pub struct PiAdapter;

pub struct PiState {
    factory: EventFactory,
    pending_tools: HashMap<String, (ActionKind, String)>,
    fresh_session_path: String,
}

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A session path Pi has never seen before, used when no resume token was
/// supplied. Pi may later promote this to a shorter id after its first
/// `SESSION` header; `translate_event`'s `found_session` handles that.
fn generate_session_path() -> String {
    let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("/tmp/pi-session-{}-{n}", std::process::id())
}

#[derive(Debug, Clone)]
pub enum PiLine {
    Session { id: String },
    ToolStart { id: String, name: String, args: String },
    ToolEnd { id: String, ok: bool },
    Note { text: String },
    Done { ok: bool, text: String },
}

#[allow(clippy::expect_used)] // literal patterns, invalid only as a build-time bug
fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^>>\s*(?P<kind>\S+)\s*(?P<rest>.*)$").expect("static pi marker pattern is valid regex")
    })
}

#[allow(clippy::expect_used)]
fn kv_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?P<key>\w+)=(?P<value>\S+)").expect("static pi key=value pattern is valid regex")
    })
}

fn kv(rest: &str, key: &str) -> Option<String> {
    kv_pattern()
        .captures_iter(rest)
        .find(|c| &c["key"] == key)
        .map(|c| c["value"].to_string())
}

fn tail_after(rest: &str, marker: &str) -> String {
    rest.find(marker)
        .map(|idx| rest[idx + marker.len()..].trim().to_string())
        .unwrap_or_default()
}

impl EngineAdapter for PiAdapter {
    type State = PiState;
    type Decoded = PiLine;

    fn engine(&self) -> &'static str {
        "pi"
    }

    fn init_state(&self, _prompt: &str, resume: Option<&ResumeToken>) -> Self::State {
        let mut factory = EventFactory::new("pi");
        if let Some(token) = resume {
            let _ = factory.started(token.clone(), None, None);
        }
        PiState {
            factory,
            pending_tools: HashMap::new(),
            fresh_session_path: generate_session_path(),
        }
    }

    fn build_command(
        &self,
        prompt: &str,
        resume: Option<&ResumeToken>,
        state: &Self::State,
    ) -> (String, Vec<String>) {
        let session = resume
            .map(|token| token.value.clone())
            .unwrap_or_else(|| state.fresh_session_path.clone());
        let args = vec!["--session".to_string(), session, prompt.to_string()];
        ("pi".to_string(), args)
    }

    fn env(&self, _state: &Self::State) -> Option<Vec<(String, String)>> {
        Some(vec![
            ("NO_COLOR".to_string(), "1".to_string()),
            ("CI".to_string(), "1".to_string()),
        ])
    }

    fn decode_line(&self, line: &str) -> Result<Option<Self::Decoded>, DecodeError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(caps) = marker_pattern().captures(line) else {
            return Ok(None);
        };
        let kind = &caps["kind"];
        let rest = caps["rest"].to_string();

        match kind {
            "SESSION" => Ok(Some(PiLine::Session { id: rest })),
            "TOOL" if rest.starts_with("start") => {
                let id = kv(&rest, "id").ok_or_else(|| DecodeError("TOOL start missing id".into()))?;
                let name = kv(&rest, "name").unwrap_or_else(|| "tool".to_string());
                let args = tail_after(&rest, "args=");
                Ok(Some(PiLine::ToolStart { id, name, args }))
            }
            "TOOL" if rest.starts_with("end") => {
                let id = kv(&rest, "id").ok_or_else(|| DecodeError("TOOL end missing id".into()))?;
                let ok = kv(&rest, "ok").map(|v| v == "true").unwrap_or(false);
                Ok(Some(PiLine::ToolEnd { id, ok }))
            }
            "NOTE" => Ok(Some(PiLine::Note { text: rest })),
            "DONE" => {
                let ok = kv(&rest, "ok").map(|v| v == "true").unwrap_or(true);
                let text = tail_after(&rest, "message=");
                Ok(Some(PiLine::Done { ok, text }))
            }
            other => Err(DecodeError(format!("unrecognized pi marker: {other}"))),
        }
    }

    fn translate_event(
        &self,
        data: Self::Decoded,
        state: &mut Self::State,
    ) -> (Vec<UnifiedEvent>, TranslateOutcome) {
        let mut events = Vec::new();
        let mut outcome = TranslateOutcome::default();

        match data {
            PiLine::Session { id } => {
                let token = ResumeToken::new("pi", id);
                if let Ok(event) = state.factory.started(token.clone(), None, None) {
                    events.push(event);
                }
                outcome.found_session = Some(token);
            }
            PiLine::ToolStart { id, name, args } => {
                let kind = if name == "shell" {
                    ActionKind::Command
                } else {
                    ActionKind::Tool
                };
                let title = if args.is_empty() {
                    name.clone()
                } else {
                    format!("{name}: {args}")
                };
                state
                    .pending_tools
                    .insert(id.clone(), (kind, title.clone()));
                events.push(state.factory.action_started(id, kind, title, None));
            }
            PiLine::ToolEnd { id, ok } => {
                let (kind, title) = state
                    .pending_tools
                    .remove(&id)
                    .unwrap_or((ActionKind::Tool, id.clone()));
                events.push(state.factory.action_completed(id, kind, title, ok, None));
            }
            PiLine::Note { text } => {
                events.push(state.factory.note(text, None, None));
            }
            PiLine::Done { ok, text } => {
                let event = if ok {
                    state.factory.completed_ok(text, None, None)
                } else {
                    state
                        .factory
                        .completed_error(text.clone(), Some(text), None, None)
                };
                events.push(event);
                outcome.done = true;
            }
        }

        (events, outcome)
    }

    fn handle_exit_error(&self, exit_code: i32, state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![state.factory.completed_error(
            format!("pi exited with status {exit_code}"),
            None,
            None,
            None,
        )]
    }

    fn handle_stream_end(&self, state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![state.factory.completed_error(
            "pi exited without a DONE marker".to_string(),
            None,
            None,
            None,
        )]
    }
}

#[cfg(test)]
#[path = "pi_tests.rs"]
mod tests;
