use super::*;
use ar_core::FakeClock;

fn token() -> ResumeToken {
    ResumeToken::new("codex", "thread_abc")
}

#[test]
fn second_acquire_by_live_owner_is_locked() {
    let registry = SessionLockRegistry::new(FakeClock::new());
    let owner_a = RunnerIdentity::new(RunnerId::new("a"));
    let owner_b = RunnerIdentity::new(RunnerId::new("b"));

    registry.acquire(&token(), owner_a.clone()).unwrap();
    let err = registry.acquire(&token(), owner_b).unwrap_err();
    assert!(matches!(err, RunnerError::SessionLocked(_)));

    // keep owner_a alive until here so is_live() sees it
    drop(owner_a);
}

#[test]
fn acquire_reclaims_after_owner_dies() {
    let registry = SessionLockRegistry::new(FakeClock::new());
    {
        let owner_a = RunnerIdentity::new(RunnerId::new("a"));
        registry.acquire(&token(), owner_a).unwrap();
        // owner_a dropped here: its OwnerHandle's only other clone is in the registry
    }

    let owner_b = RunnerIdentity::new(RunnerId::new("b"));
    registry.acquire(&token(), owner_b).unwrap();
}

#[test]
fn release_is_idempotent_and_only_removes_matching_owner() {
    let registry = SessionLockRegistry::new(FakeClock::new());
    let owner_a = RunnerIdentity::new(RunnerId::new("a"));
    let owner_b = RunnerIdentity::new(RunnerId::new("b"));

    registry.acquire(&token(), owner_a.clone()).unwrap();
    // releasing with the wrong owner does nothing
    registry.release(&token(), &owner_b);
    assert!(registry.is_locked(&token()));

    registry.release(&token(), &owner_a);
    assert!(!registry.is_locked(&token()));
    // idempotent: releasing again is a no-op, not an error
    registry.release(&token(), &owner_a);
}

#[test]
fn reclaim_stale_drops_dead_owners_only() {
    let registry = SessionLockRegistry::new(FakeClock::new());
    let live = RunnerIdentity::new(RunnerId::new("live"));
    let dead_token = ResumeToken::new("codex", "thread_dead");

    registry.acquire(&token(), live.clone()).unwrap();
    {
        let dying = RunnerIdentity::new(RunnerId::new("dying"));
        registry.acquire(&dead_token, dying).unwrap();
    }

    registry.reclaim_stale();
    assert!(registry.is_locked(&token()));
    assert!(!registry.is_locked(&dead_token));
}
