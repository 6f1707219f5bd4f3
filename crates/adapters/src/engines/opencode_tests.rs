use super::*;
use ar_core::Phase;
use ar_runner::EngineAdapter;

fn adapter() -> OpenCodeAdapter {
    OpenCodeAdapter
}

#[test]
fn step_start_emits_started_and_sets_found_session() {
    let a = adapter();
    let mut state = a.init_state("hi", None);
    let line = r#"{"type":"step_start","sessionID":"oc-1"}"#;
    let decoded = a.decode_line(line).unwrap().unwrap();
    let (events, outcome) = a.translate_event(decoded, &mut state);
    assert!(matches!(events[0], UnifiedEvent::Started { .. }));
    assert_eq!(outcome.found_session.unwrap().value, "oc-1");
}

#[test]
fn tool_part_running_then_completed_maps_to_started_then_completed() {
    let a = adapter();
    let mut state = a.init_state("hi", None);

    let running = r#"{"type":"message.part","part":{"type":"tool","id":"p1","tool":"bash",
        "state":{"status":"running","input":{"command":"pytest"}}}}"#;
    let decoded = a.decode_line(running).unwrap().unwrap();
    let (events, _) = a.translate_event(decoded, &mut state);
    match &events[0] {
        UnifiedEvent::Action { phase, action, .. } => {
            assert_eq!(*phase, Phase::Started);
            assert_eq!(action.kind, ActionKind::Command);
        }
        other => panic!("expected Action, got {other:?}"),
    }

    let completed = r#"{"type":"message.part","part":{"type":"tool","id":"p1","tool":"bash",
        "state":{"status":"completed","input":{"command":"pytest"}}}}"#;
    let decoded = a.decode_line(completed).unwrap().unwrap();
    let (events, _) = a.translate_event(decoded, &mut state);
    assert!(matches!(
        events[0],
        UnifiedEvent::Action {
            phase: Phase::Completed,
            ok: Some(true),
            ..
        }
    ));
}

#[test]
fn text_part_becomes_a_note() {
    let a = adapter();
    let mut state = a.init_state("hi", None);
    let line = r#"{"type":"message.part","part":{"type":"text","text":"working on it"}}"#;
    let decoded = a.decode_line(line).unwrap().unwrap();
    let (events, _) = a.translate_event(decoded, &mut state);
    assert!(matches!(events[0], UnifiedEvent::Action { .. }));
}

#[test]
fn step_finish_stop_is_terminal() {
    let a = adapter();
    let mut state = a.init_state("hi", None);
    let line = r#"{"type":"step_finish","reason":"stop","text":"finished"}"#;
    let decoded = a.decode_line(line).unwrap().unwrap();
    let (events, outcome) = a.translate_event(decoded, &mut state);
    assert!(outcome.done);
    assert!(matches!(events[0], UnifiedEvent::Completed { ok: true, .. }));
}

#[test]
fn step_finish_error_is_terminal_failure() {
    let a = adapter();
    let mut state = a.init_state("hi", None);
    let line = r#"{"type":"step_finish","reason":"error","message":"provider timeout"}"#;
    let decoded = a.decode_line(line).unwrap().unwrap();
    let (events, outcome) = a.translate_event(decoded, &mut state);
    assert!(outcome.done);
    assert!(matches!(events[0], UnifiedEvent::Completed { ok: false, .. }));
}

#[test]
fn step_finish_tool_calls_is_not_terminal() {
    let a = adapter();
    let mut state = a.init_state("hi", None);
    let line = r#"{"type":"step_finish","reason":"tool_calls"}"#;
    let decoded = a.decode_line(line).unwrap().unwrap();
    let (events, outcome) = a.translate_event(decoded, &mut state);
    assert!(!outcome.done);
    assert!(events.is_empty());
}

#[test]
fn resume_emits_the_session_flag() {
    let a = adapter();
    let token = ResumeToken::new("opencode", "prior-session");
    let state = a.init_state("continue", Some(&token));
    let (_, args) = a.build_command("continue", Some(&token), &state);
    assert!(args.contains(&"--session".to_string()));
    assert!(args.contains(&"prior-session".to_string()));
}
