use super::*;
use ar_core::{ResumeToken, SystemClock, UnifiedEvent};
use ar_runner::{DecodeError, EngineAdapter, TranslateOutcome};
use serde_json::Value;
use std::sync::Arc;

/// A fake engine whose "binary" is `/bin/sh -c <prompt>`, same fixture idiom
/// as `ar-runner`'s own `ScriptAdapter`: the prompt IS the script, so these
/// tests never need a real Codex/Claude/Kimi/OpenCode/Pi binary.
struct ScriptAdapter;

#[derive(Default)]
struct ScriptState;

impl EngineAdapter for ScriptAdapter {
    type State = ScriptState;
    type Decoded = Value;

    fn engine(&self) -> &'static str {
        "test"
    }

    fn init_state(&self, _prompt: &str, _resume: Option<&ResumeToken>) -> Self::State {
        ScriptState
    }

    fn build_command(
        &self,
        prompt: &str,
        _resume: Option<&ResumeToken>,
        _state: &Self::State,
    ) -> (String, Vec<String>) {
        ("/bin/sh".to_string(), vec!["-c".to_string(), prompt.to_string()])
    }

    fn decode_line(&self, line: &str) -> Result<Option<Self::Decoded>, DecodeError> {
        serde_json::from_str(line).map(Some).map_err(|e| DecodeError(e.to_string()))
    }

    fn translate_event(
        &self,
        data: Self::Decoded,
        _state: &mut Self::State,
    ) -> (Vec<UnifiedEvent>, TranslateOutcome) {
        match data.get("type").and_then(Value::as_str) {
            Some("started") => {
                let token = ResumeToken::new("test", data["token"].as_str().unwrap_or("t"));
                let event = UnifiedEvent::Started {
                    engine: "test".to_string(),
                    resume: token.clone(),
                    title: None,
                    meta: None,
                };
                (
                    vec![event],
                    TranslateOutcome {
                        found_session: Some(token),
                        done: false,
                    },
                )
            }
            Some("completed") => {
                let token = data["token"]
                    .as_str()
                    .map(|t| ResumeToken::new("test", t));
                let event = UnifiedEvent::Completed {
                    engine: "test".to_string(),
                    ok: true,
                    answer: data["answer"].as_str().unwrap_or("").to_string(),
                    resume: token,
                    error: None,
                    usage: None,
                };
                (vec![event], TranslateOutcome { found_session: None, done: true })
            }
            _ => (Vec::new(), TranslateOutcome::default()),
        }
    }

    fn handle_exit_error(&self, exit_code: i32, _state: &mut Self::State) -> Vec<UnifiedEvent> {
        vec![UnifiedEvent::Completed {
            engine: "test".to_string(),
            ok: false,
            answer: String::new(),
            resume: None,
            error: Some(format!("exit_code={exit_code}")),
            usage: None,
        }]
    }

    fn handle_stream_end(&self, state: &mut Self::State) -> Vec<UnifiedEvent> {
        self.handle_exit_error(0, state)
    }
}

fn subagent() -> Subagent<ScriptAdapter, SystemClock> {
    Subagent::new(
        Arc::new(ar_runner::JsonlRunner::new(SystemClock)),
        Arc::new(ScriptAdapter),
    )
}

#[tokio::test]
async fn start_then_collect_answer_returns_the_final_completed_answer() {
    let script = r#"printf '{"type":"started","token":"s1"}\n{"type":"completed","answer":"hi"}\n'"#;
    let session = subagent()
        .start(script, SubagentOptions::new())
        .await
        .expect("lock is free");
    let answer = session.collect_answer().await;
    assert_eq!(answer.as_deref(), Some("hi"));
    assert_eq!(session.resume_token().unwrap().value, "s1");
}

#[tokio::test]
async fn events_filters_out_agent_end_and_stops_the_sequence() {
    let script = r#"printf '{"type":"started","token":"s2"}\n{"type":"completed","answer":"done"}\n'"#;
    let session = subagent()
        .start(script, SubagentOptions::new())
        .await
        .expect("lock is free");
    let items = session.events().drain().await;
    assert_eq!(items.len(), 2);
    assert!(matches!(items[0], SimpleEvent::Started { .. }));
    assert!(matches!(items[1], SimpleEvent::Completed { ok: true, .. }));
}

#[tokio::test]
async fn resume_rejects_a_token_from_a_different_engine() {
    let token = ResumeToken::new("other-engine", "s1");
    let err = subagent()
        .resume(token, "printf ''", SubagentOptions::new())
        .await
        .expect_err("engine mismatch");
    assert!(matches!(err, FacadeError::EngineMismatch { .. }));
}

#[tokio::test]
async fn continue_session_fails_without_a_prior_resume_token() {
    let script = r#"printf 'ignored\n'"#;
    let session = subagent()
        .start(script, SubagentOptions::new())
        .await
        .expect("lock is free");
    // drain so the run finishes and the lack of a resume token is settled
    session.events().drain().await;

    let err = subagent()
        .continue_session(&session, "next", None)
        .await
        .expect_err("no resume token observed");
    assert!(matches!(err, FacadeError::NoResumeToken));
}

#[tokio::test]
async fn continue_session_reuses_the_observed_token_and_inherits_cwd() {
    let script = r#"printf '{"type":"started","token":"s3"}\n{"type":"completed","answer":"first"}\n'"#;
    let tmp = tempfile::tempdir().expect("tempdir");
    let facade = subagent();
    let first = facade
        .start(script, SubagentOptions::new().cwd(tmp.path()))
        .await
        .expect("lock is free");
    first.events().drain().await;

    let next_script = r#"printf '{"type":"started","token":"s3"}\n{"type":"completed","answer":"second"}\n'"#;
    let second = facade
        .continue_session(&first, next_script, None)
        .await
        .expect("prior token present");
    let answer = second.collect_answer().await;
    assert_eq!(answer.as_deref(), Some("second"));
}

#[tokio::test]
async fn run_collects_the_answer_and_invokes_the_event_callback() {
    let script = r#"printf '{"type":"started","token":"s4"}\n{"type":"completed","answer":"ran"}\n'"#;
    let mut seen = 0;
    let answer = subagent()
        .run(script, SubagentOptions::new(), |_event| seen += 1)
        .await
        .expect("completes");
    assert_eq!(answer, "ran");
    assert_eq!(seen, 2);
}

#[tokio::test]
async fn run_still_resolves_when_the_child_exits_without_emitting_its_own_completed() {
    // `handle_stream_end` synthesizes a terminal Completed for any run that
    // exits 0 without one of its own, so `run` resolves rather than hanging.
    let script = "true";
    let answer = subagent()
        .run(script, SubagentOptions::new(), |_event| {})
        .await
        .expect("handle_stream_end synthesizes a terminal Completed");
    assert_eq!(answer, "");
}
