// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude Code adapter. Wire shape grounded on the JSONL session log this
//! codebase used to tail directly (`assistant`/`user`/`result` records, tool
//! use blocks under `message.content`, a terminal `result` record carrying
//! `session_id` and `is_error`) — now consumed one streamed line at a time
//! instead of by polling a log file.

use ar_core::{ActionKind, EventFactory, ResumeToken, UnifiedEvent};
use ar_runner::{DecodeError, EngineAdapter, TranslateOutcome};
use serde_json::Value;
use std::collections::HashMap;

pub struct ClaudeAdapter;

pub struct ClaudeState {
    factory: EventFactory,
    pending_tools: HashMap<String, (ActionKind, String)>,
}

impl EngineAdapter for ClaudeAdapter {
    type State = ClaudeState;
    type Decoded = Value;

    fn engine(&self) -> &'static str {
        "claude"
    }

    fn init_state(&self, _prompt: &str, resume: Option<&ResumeToken>) -> Self::State {
        let mut factory = EventFactory::new("claude");
        if let Some(token) = resume {
            let _ = factory.started(token.clone(), None, None);
        }
        ClaudeState {
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
        let mut args = vec![
            "-p".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];
        if let Some(token) = resume {
            args.push("--resume".to_string());
            args.push(token.value.clone());
        }
        ("claude".to_string(), args)
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
            Some("system") if data.get("subtype").and_then(Value::as_str) == Some("init") => {
                if let Some(session_id) = data.get("session_id").and_then(Value::as_str) {
                    let token = ResumeToken::new("claude", session_id);
                    if let Ok(event) = state.factory.started(token.clone(), None, None) {
                        events.push(event);
                    }
                    outcome.found_session = Some(token);
                }
            }
            Some("assistant") => {
                if let Some(blocks) = data
                    .pointer("/message/content")
                    .and_then(Value::as_array)
                {
                    for block in blocks {
                        if block.get("type").and_then(Value::as_str) != Some("tool_use") {
                            continue;
                        }
                        let (Some(id), Some(name)) = (
                            block.get("id").and_then(Value::as_str),
                            block.get("name").and_then(Value::as_str),
                        ) else {
                            continue;
                        };
                        let kind = tool_kind(name);
                        let title = tool_title(name, block.get("input"));
                        state
                            .pending_tools
                            .insert(id.to_string(), (kind, title.clone()));
                        events.push(state.factory.action_started(id.to_string(), kind, title, None));
                    }
                }
            }
            Some("user") => {
                if let Some(blocks) = data
                    .pointer("/message/content")
                    .and_then(Value::as_array)
                {
                    for block in blocks {
                        if block.get("type").and_then(Value::as_str) != Some("tool_result") {
                            continue;
                        }
                        let id = block
                            .get("tool_use_id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        if block.get("is_error").and_then(Value::as_bool) == Some(true) {
                            state.pending_tools.remove(&id);
                            let message = tool_result_text(block.get("content"))
                                .unwrap_or_else(|| "tool call denied or failed".to_string());
                            events.push(state.factory.note(
                                message,
                                Some(false),
                                Some("warning".to_string()),
                            ));
                            continue;
                        }
                        let (kind, title) = state
                            .pending_tools
                            .remove(&id)
                            .unwrap_or((ActionKind::Tool, id.clone()));
                        events.push(state.factory.action_completed(id, kind, title, true, None));
                    }
                }
            }
            Some("result") => {
                let ok = !data
                    .get("is_error")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let answer = data
                    .get("result")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let resume = data
                    .get("session_id")
                    .and_then(Value::as_str)
                    .map(|s| ResumeToken::new("claude", s));
                let usage = data.get("usage").cloned();
                let event = if ok {
                    state.factory.completed_ok(answer, resume, usage)
                } else {
                    state
                        .factory
                        .completed_error(answer.clone(), Some(answer), resume, usage)
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
            format!("claude exited with status {exit_code}"),
            None,
            None,
            None,
        )]
    }

    fn handle_stream_end(&self, state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![state.factory.completed_error(
            "claude exited without a terminal result record".to_string(),
            None,
            None,
            None,
        )]
    }
}

fn tool_kind(name: &str) -> ActionKind {
    match name {
        "Bash" => ActionKind::Command,
        "Read" | "Edit" | "Write" | "NotebookEdit" => ActionKind::FileChange,
        "WebSearch" | "WebFetch" => ActionKind::WebSearch,
        "Task" => ActionKind::Subagent,
        _ => ActionKind::Tool,
    }
}

fn tool_result_text(content: Option<&Value>) -> Option<String> {
    match content {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .find_map(|b| b.get("text").and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

fn tool_title(name: &str, input: Option<&Value>) -> String {
    let path = input
        .and_then(|i| i.get("file_path").or_else(|| i.get("notebook_path")))
        .and_then(Value::as_str);
    let command = input.and_then(|i| i.get("command")).and_then(Value::as_str);
    match (path, command) {
        (Some(path), _) => format!("{name}: {path}"),
        (_, Some(command)) => format!("{name}: {command}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
