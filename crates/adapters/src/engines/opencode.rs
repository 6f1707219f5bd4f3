// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenCode adapter. Wire shape: `opencode run --print-logs --format json`
//! streams a `type`-tagged event per line. Session identity arrives on
//! `step_start` (`sessionID`); tool invocations arrive as a single
//! `message.part` carrying a nested `part.state.status` of `running` or
//! `completed` rather than as two separate begin/end records; `step_finish`
//! with `reason: "stop"` is the terminal translated event, other reasons
//! (e.g. `tool_calls`) mean the step loop continues.

use ar_core::{ActionKind, EventFactory, ResumeToken, UnifiedEvent};
use ar_runner::{DecodeError, EngineAdapter, TranslateOutcome};
use serde_json::Value;

pub struct OpenCodeAdapter;

pub struct OpenCodeState {
    factory: EventFactory,
}

impl EngineAdapter for OpenCodeAdapter {
    type State = OpenCodeState;
    type Decoded = Value;

    fn engine(&self) -> &'static str {
        "opencode"
    }

    fn init_state(&self, _prompt: &str, resume: Option<&ResumeToken>) -> Self::State {
        let mut factory = EventFactory::new("opencode");
        if let Some(token) = resume {
            let _ = factory.started(token.clone(), None, None);
        }
        OpenCodeState { factory }
    }

    fn build_command(
        &self,
        prompt: &str,
        resume: Option<&ResumeToken>,
        _state: &Self::State,
    ) -> (String, Vec<String>) {
        let mut args = vec![
            "run".to_string(),
            "--print-logs".to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        if let Some(token) = resume {
            args.push("--session".to_string());
            args.push(token.value.clone());
        }
        args.push(prompt.to_string());
        ("opencode".to_string(), args)
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
            Some("step_start") => {
                if let Some(id) = data.get("sessionID").and_then(Value::as_str) {
                    let token = ResumeToken::new("opencode", id);
                    if let Ok(event) = state.factory.started(token.clone(), None, None) {
                        events.push(event);
                    }
                    outcome.found_session = Some(token);
                }
            }
            Some("message.part") => {
                let Some(part) = data.get("part") else {
                    return (events, outcome);
                };
                match part.get("type").and_then(Value::as_str) {
                    Some("text") => {
                        if let Some(text) = part.get("text").and_then(Value::as_str) {
                            events.push(state.factory.note(text.to_string(), None, None));
                        }
                    }
                    Some("tool") => {
                        let tool_name = part.get("tool").and_then(Value::as_str).unwrap_or("tool");
                        let Some(part_id) = part.get("id").and_then(Value::as_str) else {
                            return (events, outcome);
                        };
                        let status = part
                            .pointer("/state/status")
                            .and_then(Value::as_str)
                            .unwrap_or("running");
                        let kind = opencode_tool_kind(tool_name);
                        let title = opencode_tool_title(tool_name, part.pointer("/state/input"));
                        let event = match status {
                            "completed" => state.factory.action_completed(
                                part_id.to_string(),
                                kind,
                                title,
                                true,
                                None,
                            ),
                            "error" => state.factory.action_completed(
                                part_id.to_string(),
                                kind,
                                title,
                                false,
                                None,
                            ),
                            _ => {
                                state
                                    .factory
                                    .action_started(part_id.to_string(), kind, title, None)
                            }
                        };
                        events.push(event);
                    }
                    _ => {}
                }
            }
            Some("step_finish") => match data.get("reason").and_then(Value::as_str) {
                Some("stop") => {
                    let answer = data
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string();
                    events.push(state.factory.completed_ok(answer, None, None));
                    outcome.done = true;
                }
                Some("error") => {
                    let message = data
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("opencode reported an error")
                        .to_string();
                    events.push(state.factory.completed_error(message, None, None, None));
                    outcome.done = true;
                }
                _ => {
                    // other reasons (e.g. tool_calls) mean the step loop continues
                }
            },
            _ => {}
        }

        (events, outcome)
    }

    fn handle_exit_error(&self, exit_code: i32, state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![state.factory.completed_error(
            format!("opencode exited with status {exit_code}"),
            None,
            None,
            None,
        )]
    }

    fn handle_stream_end(&self, state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![state.factory.completed_error(
            "opencode exited without a step_finish(stop) event".to_string(),
            None,
            None,
            None,
        )]
    }
}

fn opencode_tool_kind(name: &str) -> ActionKind {
    match name {
        "bash" => ActionKind::Command,
        "read" | "write" | "edit" | "patch" => ActionKind::FileChange,
        "webfetch" | "websearch" => ActionKind::WebSearch,
        "task" => ActionKind::Subagent,
        _ => ActionKind::Tool,
    }
}

fn opencode_tool_title(name: &str, input: Option<&Value>) -> String {
    let path = input.and_then(|i| i.get("filePath")).and_then(Value::as_str);
    let command = input.and_then(|i| i.get("command")).and_then(Value::as_str);
    match (path, command) {
        (Some(path), _) => format!("{name}: {path}"),
        (_, Some(command)) => format!("{name}: {command}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
#[path = "opencode_tests.rs"]
mod tests;
