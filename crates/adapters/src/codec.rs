// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Resume-Token Text Codec (C7): pulls a session/resume identifier out of
//! an engine's free-form human-readable output, for engines that print the
//! exact command to continue a session in prose rather than (or in addition
//! to) a structured JSONL field.
//!
//! Recognizes exactly the six canonical invocations, case-insensitively:
//! `codex resume <id>`, `claude --resume <id>`, `kimi --session <id>`,
//! `opencode --session ses_<id>` (with an optional leading `run`),
//! `pi --session <token-possibly-quoted>`, `lemon resume <id>`.

use ar_core::ResumeToken;
use regex::Regex;
use std::sync::OnceLock;

const TOKEN: &str = r#"(?:"(?P<dq>[^"]+)"|'(?P<sq>[^']+)'|(?P<bare>[^\s"']+))"#;
const TOKEN_PLAIN: &str = r#"(?:"[^"]+"|'[^']+'|[^\s"']+)"#;

#[allow(clippy::expect_used)] // a malformed literal pattern here is a build-time bug, not a runtime one
fn compile(pattern: String) -> Regex {
    Regex::new(&pattern).expect("static resume-token pattern is valid regex")
}

/// The canonical invocation pattern for `engine`, or `None` if the engine has
/// no recognized text form.
fn pattern_for(engine: &str) -> Option<&'static Regex> {
    macro_rules! cached {
        ($lock:ident, $body:expr) => {{
            static $lock: OnceLock<Regex> = OnceLock::new();
            Some($lock.get_or_init(|| compile($body)))
        }};
    }

    match engine {
        "codex" => cached!(CODEX, format!(r"(?i)\bcodex\s+resume\s+{TOKEN}")),
        "lemon" => cached!(LEMON, format!(r"(?i)\blemon\s+resume\s+{TOKEN}")),
        "claude" => cached!(CLAUDE, format!(r"(?i)\bclaude\s+--resume\s+{TOKEN}")),
        "kimi" => cached!(KIMI, format!(r"(?i)\bkimi\s+--session\s+{TOKEN}")),
        "opencode" => cached!(
            OPENCODE,
            format!(r#"(?i)\bopencode\s+(?:run\s+)?--session\s+(?P<bare>ses_[^\s"']+)"#)
        ),
        "pi" => cached!(PI, format!(r"(?i)\bpi\s+--session\s+{TOKEN}")),
        _ => None,
    }
}

/// Scans `text` for `engine`'s canonical resume invocation.
pub fn extract(engine: &str, text: &str) -> Option<ResumeToken> {
    let caps = pattern_for(engine)?.captures(text)?;
    let token = caps
        .name("dq")
        .or_else(|| caps.name("sq"))
        .or_else(|| caps.name("bare"))?;
    Some(ResumeToken::new(engine, token.as_str()))
}

/// Strict check: the trimmed line is essentially one of the six canonical
/// resume invocations, not just a line that happens to mention one.
pub fn is_resume_line(line: &str) -> bool {
    static WHOLE_LINE: OnceLock<Regex> = OnceLock::new();
    let pattern = WHOLE_LINE.get_or_init(|| {
        compile(format!(
            r#"(?ix) ^ (?:
                (?:codex|lemon) \s+ resume \s+ {TOKEN_PLAIN}
                | claude \s+ --resume \s+ {TOKEN_PLAIN}
                | kimi \s+ --session \s+ {TOKEN_PLAIN}
                | opencode \s+ (?:run\s+)? --session \s+ ses_[^\s"']+
                | pi \s+ --session \s+ {TOKEN_PLAIN}
            ) $"#
        ))
    });
    pattern.is_match(line.trim())
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
