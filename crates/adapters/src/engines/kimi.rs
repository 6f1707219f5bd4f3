// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kimi CLI adapter. Wire shape: `kimi run --json` streams one JSON object
//! per line keyed by `event` (`session`, `tool_call`, `tool_result`,
//! `message`, `done`), with a synthetic `id` tying a `tool_call` to its
//! matching `tool_result` the way `codex`'s `call_id` does.
//!
//! Kimi's real session id does not appear on the stream at all; a host would
//! normally reconstruct it from a work-dir-to-session map in its own config
//! file. `init_state`/`build_command` only ever see `prompt`/`resume`, not a
//! `cwd`, so that lookup is a host-side concern layered on top of this
//! adapter rather than something `decode_line`/`translate_event` can do —
//! this adapter treats a `session` event on the stream as authoritative,
//! which covers the common case where Kimi does echo one on start.

use ar_core::{ActionKind, EventFactory, ResumeToken, UnifiedEvent};
use ar_runner::{DecodeError, EngineAdapter, TranslateOutcome};
use serde_json::Value;
use std::collections::HashMap;

pub struct KimiAdapter;

pub struct KimiState {
    factory: EventFactory,
    pending_tools: HashMap<String, (ActionKind, String)>,
}

impl EngineAdapter for KimiAdapter {
    type State = KimiState;
    type Decoded = Value;

    fn engine(&self) -> &'static str {
        "kimi"
    }

    fn init_state(&self, _prompt: &str, resume: Option<&ResumeToken>) -> Self::State {
        let mut factory = EventFactory::new("kimi");
        if let Some(token) = resume {
            let _ = factory.started(token.clone(), None, None);
        }
        KimiState {
            factory,
            pending_tools: HashMap::new(),
        }
    }

    fn build_command(
        &self,
        prompt: &str,
        resume: Option<&ResumeToken>,
        _state: &Self::State,
    ) -> (String, Vec<String>) {
        let mut args = vec!["run".to_string(), "--json".to_string()];
        if let Some(token) = resume {
            args.push("--session".to_string());
            args.push(token.value.clone());
        }
        args.push(prompt.to_string());
        ("kimi".to_string(), args)
    }

    fn decode_line(&self, line: &str) -> Result<Option<Self::Decoded>, DecodeError> {
        serde_json::from_str(line)
            .map(Some)
            .map_err(|e| DecodeError(e.to_string()))
    }

    fn translate_event(
        &self,
        data: Self::Decoded,
        state: &mut Self::State,
    ) -> (Vec<UnifiedEvent>, TranslateOutcome) {
        let mut events = Vec::new();
        let mut outcome = TranslateOutcome::default();

        match data.get("event").and_then(Value::as_str) {
            Some("session") => {
                if let Some(id) = data.get("id").and_then(Value::as_str) {
                    let token = ResumeToken::new("kimi", id);
                    if let Ok(event) = state.factory.started(token.clone(), None, None) {
                        events.push(event);
                    }
                    outcome.found_session = Some(token);
                }
            }
            Some("tool_call") => {
                if let (Some(id), Some(name)) = (
                    data.get("id").and_then(Value::as_str),
                    data.get("name").and_then(Value::as_str),
                ) {
                    let kind = kimi_tool_kind(name);
                    let title = kimi_tool_title(name, data.get("arguments"));
                    state
                        .pending_tools
                        .insert(id.to_string(), (kind, title.clone()));
                    events.push(state.factory.action_started(id.to_string(), kind, title, None));
                }
            }
            Some("tool_result") => {
                if let Some(id) = data.get("id").and_then(Value::as_str) {
                    let (kind, title) = state
                        .pending_tools
                        .remove(id)
                        .unwrap_or((ActionKind::Tool, id.to_string()));
                    let ok = data.get("ok").and_then(Value::as_bool).unwrap_or(false);
                    events.push(
                        state
                            .factory
                            .action_completed(id.to_string(), kind, title, ok, None),
                    );
                }
            }
            Some("message") => {
                if let Some(text) = data.get("text").and_then(Value::as_str) {
                    events.push(state.factory.note(text.to_string(), None, None));
                }
            }
            Some("done") => {
                let ok = data.get("ok").and_then(Value::as_bool).unwrap_or(true);
                let text = data
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
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
            _ => {}
        }

        (events, outcome)
    }

    fn handle_exit_error(&self, exit_code: i32, state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![state.factory.completed_error(
            format!("kimi exited with status {exit_code}"),
            None,
            None,
            None,
        )]
    }

    fn handle_stream_end(&self, state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![state.factory.completed_error(
            "kimi exited without a done event".to_string(),
            None,
            None,
            None,
        )]
    }
}

fn kimi_tool_kind(name: &str) -> ActionKind {
    match name {
        "shell" | "bash" => ActionKind::Command,
        "read_file" | "write_file" | "edit_file" => ActionKind::FileChange,
        "web_search" => ActionKind::WebSearch,
        _ => ActionKind::Tool,
    }
}

fn kimi_tool_title(name: &str, arguments: Option<&Value>) -> String {
    let command = arguments.and_then(|a| a.get("command")).and_then(Value::as_str);
    let path = arguments.and_then(|a| a.get("path")).and_then(Value::as_str);
    match (command, path) {
        (Some(command), _) => format!("{name}: {command}"),
        (_, Some(path)) => format!("{name}: {path}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
#[path = "kimi_tests.rs"]
mod tests;
