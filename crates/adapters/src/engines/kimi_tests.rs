use super::*;
use ar_core::Phase;
use ar_runner::EngineAdapter;

fn adapter() -> KimiAdapter {
    KimiAdapter
}

#[test]
fn session_event_emits_started_and_sets_found_session() {
    let a = adapter();
    let mut state = a.init_state("hi", None);
    let line = r#"{"event":"session","id":"kimi-sess-1"}"#;
    let decoded = a.decode_line(line).unwrap().unwrap();
    let (events, outcome) = a.translate_event(decoded, &mut state);
    assert!(matches!(events[0], UnifiedEvent::Started { .. }));
    assert_eq!(outcome.found_session.unwrap().value, "kimi-sess-1");
}

#[test]
fn tool_call_then_result_pairs_into_started_then_completed() {
    let a = adapter();
    let mut state = a.init_state("hi", None);

    let call = r#"{"event":"tool_call","id":"t1","name":"shell","arguments":{"command":"ls"}}"#;
    let decoded = a.decode_line(call).unwrap().unwrap();
    let (events, _) = a.translate_event(decoded, &mut state);
    match &events[0] {
        UnifiedEvent::Action { phase, action, .. } => {
            assert_eq!(*phase, Phase::Started);
            assert_eq!(action.kind, ActionKind::Command);
            assert!(action.title.contains("ls"));
        }
        other => panic!("expected Action, got {other:?}"),
    }

    let result = r#"{"event":"tool_result","id":"t1","ok":true}"#;
    let decoded = a.decode_line(result).unwrap().unwrap();
    let (events, _) = a.translate_event(decoded, &mut state);
    match &events[0] {
        UnifiedEvent::Action { phase, ok, .. } => {
            assert_eq!(*phase, Phase::Completed);
            assert_eq!(*ok, Some(true));
        }
        other => panic!("expected Action, got {other:?}"),
    }
}

#[test]
fn done_with_ok_false_is_terminal_and_marks_failure() {
    let a = adapter();
    let mut state = a.init_state("hi", None);
    let line = r#"{"event":"done","ok":false,"text":"ran out of budget"}"#;
    let decoded = a.decode_line(line).unwrap().unwrap();
    let (events, outcome) = a.translate_event(decoded, &mut state);
    assert!(outcome.done);
    assert!(matches!(events[0], UnifiedEvent::Completed { ok: false, .. }));
}

#[test]
fn message_event_becomes_a_note() {
    let a = adapter();
    let mut state = a.init_state("hi", None);
    let line = r#"{"event":"message","text":"thinking about it"}"#;
    let decoded = a.decode_line(line).unwrap().unwrap();
    let (events, outcome) = a.translate_event(decoded, &mut state);
    assert!(matches!(events[0], UnifiedEvent::Action { .. }));
    assert!(!outcome.done);
}

#[test]
fn resume_emits_the_session_flag() {
    let a = adapter();
    let token = ResumeToken::new("kimi", "prior-session");
    let state = a.init_state("continue", Some(&token));
    let (_, args) = a.build_command("continue", Some(&token), &state);
    assert!(args.contains(&"--session".to_string()));
    assert!(args.contains(&"prior-session".to_string()));
}
