// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Codex CLI adapter. Wire shape: `codex exec --json` streams a `type`-tagged
//! event per line. `thread.started` carries the session id; turns are
//! bracketed by `turn.started`/`turn.completed`/`turn.failed`; turn items
//! (`item.started`/`item.completed`) carry their own `item.type` —
//! `command_execution`, `file_change`, `mcp_tool_call`, `web_search`,
//! `todo_list`, `reasoning`, `agent_message` (the final answer), `error`.
//! A `stream_error` with a `"Reconnecting... N/M"`-shaped message becomes a
//! `note` action, `started` on the first attempt and `updated` on every
//! attempt after that.

use ar_core::{ActionKind, EventFactory, ResumeToken, UnifiedEvent};
use ar_runner::{DecodeError, EngineAdapter, TranslateOutcome};
use serde_json::Value;

pub struct CodexAdapter;

pub struct CodexState {
    factory: EventFactory,
    seen_reconnect: bool,
    turn_seq: u64,
}

impl EngineAdapter for CodexAdapter {
    type State = CodexState;
    type Decoded = Value;

    fn engine(&self) -> &'static str {
        "codex"
    }

    fn init_state(&self, _prompt: &str, resume: Option<&ResumeToken>) -> Self::State {
        let mut factory = EventFactory::new("codex");
        if let Some(token) = resume {
            let _ = factory.started(token.clone(), None, None);
        }
        CodexState {
            factory,
            seen_reconnect: false,
            turn_seq: 0,
        }
    }

    fn build_command(
        &self,
        prompt: &str,
        resume: Option<&ResumeToken>,
        _state: &Self::State,
    ) -> (String, Vec<String>) {
        let mut args = vec!["exec".to_string()];
        if let Some(token) = resume {
            args.push("resume".to_string());
            args.push(token.value.clone());
        }
        args.push("--json".to_string());
        args.push(prompt.to_string());
        ("codex".to_string(), args)
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

        match data.get("type").and_then(Value::as_str) {
            Some("thread.started") => {
                if let Some(id) = data.get("thread_id").and_then(Value::as_str) {
                    let token = ResumeToken::new("codex", id);
                    if let Ok(event) = state.factory.started(token.clone(), None, None) {
                        events.push(event);
                    }
                    outcome.found_session = Some(token);
                }
            }
            Some("turn.started") => {
                let id = format!("turn_{}", state.turn_seq);
                state.turn_seq += 1;
                events.push(state.factory.action_started(id, ActionKind::Turn, "turn", None));
            }
            Some("item.started") => {
                if let Some(event) = codex_item_event(state, &data, false) {
                    events.push(event);
                }
            }
            Some("item.completed") => {
                if let Some(item) = data.get("item") {
                    if item.get("type").and_then(Value::as_str) == Some("agent_message") {
                        // answer text arrives with the turn's own completion event, not here
                    } else if let Some(event) = codex_item_event(state, &data, true) {
                        events.push(event);
                    }
                }
            }
            Some("turn.completed") => {
                let answer = data
                    .pointer("/turn/agent_message")
                    .or_else(|| data.get("agent_message"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let usage = data.get("usage").cloned();
                events.push(state.factory.completed_ok(answer, None, usage));
                outcome.done = true;
            }
            Some("turn.failed") => {
                let message = data
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("codex turn failed")
                    .to_string();
                events.push(state.factory.completed_error(message, None, None, None));
                outcome.done = true;
            }
            Some("stream_error") => {
                let message = data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("reconnecting")
                    .to_string();
                let event = if state.seen_reconnect {
                    state.factory.action_updated(
                        "reconnect".to_string(),
                        ActionKind::Warning,
                        message,
                        None,
                    )
                } else {
                    state.seen_reconnect = true;
                    state.factory.action_started(
                        "reconnect".to_string(),
                        ActionKind::Warning,
                        message,
                        None,
                    )
                };
                events.push(event);
            }
            Some("error") => {
                let message = data
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("codex reported an error")
                    .to_string();
                events.push(state.factory.completed_error(message, None, None, None));
                outcome.done = true;
            }
            _ => {}
        }

        (events, outcome)
    }

    fn handle_exit_error(&self, exit_code: i32, state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![state.factory.completed_error(
            format!("codex exited with status {exit_code}"),
            None,
            None,
            None,
        )]
    }

    fn handle_stream_end(&self, state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![state.factory.completed_error(
            "codex exited without a turn.completed or turn.failed event".to_string(),
            None,
            None,
            None,
        )]
    }
}

fn codex_item_event(state: &mut CodexState, data: &Value, completed: bool) -> Option<UnifiedEvent> {
    let item = data.get("item")?;
    let id = item.get("id").and_then(Value::as_str)?.to_string();
    let kind = codex_item_kind(item.get("type").and_then(Value::as_str).unwrap_or(""));
    let title = codex_item_title(item);
    Some(if completed {
        let ok = item
            .get("exit_code")
            .and_then(Value::as_i64)
            .map(|c| c == 0)
            .unwrap_or(true);
        state.factory.action_completed(id, kind, title, ok, None)
    } else {
        state.factory.action_started(id, kind, title, None)
    })
}

fn codex_item_kind(item_type: &str) -> ActionKind {
    match item_type {
        "command_execution" => ActionKind::Command,
        "file_change" => ActionKind::FileChange,
        "mcp_tool_call" => ActionKind::Tool,
        "web_search" => ActionKind::WebSearch,
        "todo_list" | "reasoning" => ActionKind::Note,
        _ => ActionKind::Tool,
    }
}

fn codex_item_title(item: &Value) -> String {
    item.get("command")
        .or_else(|| item.get("path"))
        .or_else(|| item.get("query"))
        .or_else(|| item.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| item.get("type").and_then(Value::as_str).unwrap_or("item").to_string())
}

#[cfg(test)]
#[path = "codex_tests.rs"]
mod tests;
