// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The consuming-`self` builder for a facade call's run configuration, in the
//! style of `oj_shell::ShellExecutor`: a plain `::new()` plus chained setters,
//! read at the call site as a fluent sentence rather than a constructor with
//! a long positional argument list.

use ar_runner::{AlwaysAlive, OwnerMonitor, RunnerOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Everything a [`crate::Subagent`] call needs besides the prompt itself and
/// (for `resume`/`continue`) the resume token.
#[derive(Clone)]
pub struct SubagentOptions {
    pub(crate) cwd: Option<PathBuf>,
    pub(crate) env: Vec<(String, String)>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) cancel_grace: Duration,
    pub(crate) owner: Arc<dyn OwnerMonitor>,
}

impl SubagentOptions {
    pub fn new() -> Self {
        Self {
            cwd: None,
            env: Vec::new(),
            timeout: Some(Duration::from_secs(600)),
            cancel_grace: Duration::from_millis(1000),
            owner: Arc::new(AlwaysAlive),
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs(
        mut self,
        vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    pub fn owner(mut self, owner: Arc<dyn OwnerMonitor>) -> Self {
        self.owner = owner;
        self
    }

    pub(crate) fn into_runner_options(self, prompt: impl Into<String>) -> RunnerOptions {
        let mut options = RunnerOptions::new(prompt);
        if let Some(cwd) = self.cwd {
            options = options.cwd(cwd);
        }
        for (key, value) in self.env {
            options = options.env(key, value);
        }
        options.timeout(self.timeout).cancel_grace(self.cancel_grace)
    }
}

impl Default for SubagentOptions {
    fn default() -> Self {
        Self::new()
    }
}
