use super::*;

#[test]
fn extracts_codex_resume() {
    let token = extract("codex", "codex resume thread_abc").unwrap();
    assert_eq!(token.value, "thread_abc");
    assert_eq!(token.engine, "codex");
}

#[test]
fn extracts_lemon_resume() {
    let token = extract("lemon", "Run `lemon resume abc123` to continue.").unwrap();
    assert_eq!(token.value, "abc123");
}

#[test]
fn extracts_claude_resume() {
    let token = extract("claude", "claude --resume sess_9f8e7d6c").unwrap();
    assert_eq!(token.value, "sess_9f8e7d6c");
}

#[test]
fn extracts_kimi_session() {
    let token = extract("kimi", "kimi --session turn-42").unwrap();
    assert_eq!(token.value, "turn-42");
}

#[test]
fn extracts_opencode_session() {
    let token = extract("opencode", "opencode --session ses_oc7").unwrap();
    assert_eq!(token.value, "ses_oc7");
}

#[test]
fn extracts_opencode_session_with_run_prefix() {
    let token = extract("opencode", "opencode run --session ses_oc7").unwrap();
    assert_eq!(token.value, "ses_oc7");
}

#[test]
fn extracts_pi_session_quoted() {
    let token = extract("pi", r#"pi --session "PI-TURN-1""#).unwrap();
    assert_eq!(token.value, "PI-TURN-1");
}

#[test]
fn extracts_pi_session_unquoted() {
    let token = extract("pi", "pi --session pi-turn-1").unwrap();
    assert_eq!(token.value, "pi-turn-1");
}

#[test]
fn is_case_insensitive() {
    let token = extract("codex", "CODEX RESUME thread_ABC").unwrap();
    assert_eq!(token.value, "thread_ABC");
}

#[test]
fn returns_none_without_a_marker() {
    assert!(extract("codex", "just some ordinary output, no markers here").is_none());
}

#[test]
fn returns_none_for_the_wrong_engines_form() {
    assert!(extract("claude", "codex resume thread_abc").is_none());
}

#[test]
fn is_resume_line_matches_each_canonical_form() {
    assert!(is_resume_line("codex resume thread_abc"));
    assert!(is_resume_line("lemon resume abc123"));
    assert!(is_resume_line("claude --resume sess_9f8e7d6c"));
    assert!(is_resume_line("kimi --session turn-42"));
    assert!(is_resume_line("opencode --session ses_oc7"));
    assert!(is_resume_line("opencode run --session ses_oc7"));
    assert!(is_resume_line(r#"pi --session "PI-TURN-1""#));
    assert!(is_resume_line("  claude --resume sess_9f8e7d6c  "));
    assert!(is_resume_line("CODEX RESUME THREAD_ABC"));
}

#[test]
fn is_resume_line_rejects_prose_that_merely_mentions_a_keyword() {
    assert!(!is_resume_line("the session: great"));
    assert!(!is_resume_line("hello world"));
    assert!(!is_resume_line("you can resume this later"));
    assert!(!is_resume_line(
        "to continue, run: claude --resume sess_1 afterwards"
    ));
}
