// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure line splitting over arbitrarily-chunked byte input (P4).
//!
//! `LineBuffer` is a fold: feeding bytes `c1, c2, ..., cn` whose concatenation
//! equals some `s` yields the same sequence of complete lines as feeding `s`
//! in one call. The only state is the trailing partial line.

/// Accumulates bytes across chunk boundaries and yields complete, `\r`-trimmed lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of bytes, returning any newly-completed lines. Empty
    /// lines are NOT filtered here (callers do that); this only splits.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(chunk);
        let mut lines = Vec::new();
        loop {
            let Some(pos) = self.partial.iter().position(|&b| b == b'\n') else {
                break;
            };
            let mut line: Vec<u8> = self.partial.drain(..=pos).collect();
            line.pop(); // drop the '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever remains unterminated. The spec never flushes this on EOF as
    /// a line: a child that exits mid-line without a trailing `\n` simply
    /// loses that partial fragment, matching "the trailing partial chunk
    /// remains in the buffer" with no further promise once streaming ends.
    pub fn pending(&self) -> &[u8] {
        &self.partial
    }
}

#[cfg(test)]
#[path = "line_buffer_tests.rs"]
mod tests;
