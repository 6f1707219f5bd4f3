// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Session-Lock Registry (C3): a process-wide table ensuring at most one
//! live runner ever holds a given `(engine, session_value)` key at once.

use crate::error::RunnerError;
use ar_core::{Clock, ResumeToken, RunnerId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A liveness token a runner hands the registry when it acquires a lock.
///
/// The runner keeps one clone for the life of its task; the registry keeps
/// another inside the [`LockRecord`]. Once the runner finalizes and drops its
/// clone, only the registry's clone remains and [`OwnerHandle::is_live`]
/// reports false, making the record reclaimable without any cross-task
/// signaling or polling.
#[derive(Clone)]
pub struct OwnerHandle(Arc<()>);

impl OwnerHandle {
    pub fn new() -> Self {
        Self(Arc::new(()))
    }

    fn is_live(&self) -> bool {
        Arc::strong_count(&self.0) > 1
    }
}

impl Default for OwnerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies the runner holding a lock record.
#[derive(Clone)]
pub struct RunnerIdentity {
    pub id: RunnerId,
    pub owner: OwnerHandle,
}

impl RunnerIdentity {
    pub fn new(id: RunnerId) -> Self {
        Self {
            id,
            owner: OwnerHandle::new(),
        }
    }
}

struct LockRecord {
    owner: RunnerIdentity,
    #[allow(dead_code)] // carried per spec; no sweeper reads it (see DESIGN.md)
    acquired_at: u64,
}

/// Process-wide mapping keyed by `(engine, value)`. All operations are
/// short, mutex-guarded, and never held across `.await` (§5, §9).
pub struct SessionLockRegistry<C: Clock> {
    table: Mutex<HashMap<(String, String), LockRecord>>,
    clock: C,
}

impl<C: Clock> SessionLockRegistry<C> {
    pub fn new(clock: C) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Insert-if-absent. Reclaims (and succeeds) if the existing owner is dead.
    pub fn acquire(
        &self,
        token: &ResumeToken,
        owner: RunnerIdentity,
    ) -> Result<(), RunnerError> {
        let key = (token.engine.clone(), token.value.clone());
        let mut table = self.table.lock();
        if let Some(existing) = table.get(&key) {
            if existing.owner.owner.is_live() {
                return Err(RunnerError::SessionLocked(token.clone()));
            }
        }
        table.insert(
            key,
            LockRecord {
                owner,
                acquired_at: self.clock.epoch_ms(),
            },
        );
        Ok(())
    }

    /// Deletes iff the current owner matches. Idempotent.
    pub fn release(&self, token: &ResumeToken, owner: &RunnerIdentity) {
        let key = (token.engine.clone(), token.value.clone());
        let mut table = self.table.lock();
        if let Some(existing) = table.get(&key) {
            if existing.owner.id == owner.id {
                table.remove(&key);
            }
        }
    }

    /// Best-effort sweep of dead-owner records. Not required for correctness:
    /// `acquire` already reclaims lazily (see DESIGN.md for the Open Question
    /// decision); exposed for callers that want to bound registry growth.
    pub fn reclaim_stale(&self) {
        let mut table = self.table.lock();
        table.retain(|_, record| record.owner.owner.is_live());
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn is_locked(&self, token: &ResumeToken) -> bool {
        let key = (token.engine.clone(), token.value.clone());
        self.table
            .lock()
            .get(&key)
            .is_some_and(|r| r.owner.owner.is_live())
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
