//! Integration tests for the lock protocol

use chrono::{Duration, Utc};
use coedit_locks::{
    can_activate, is_editable, read_lock, set_lock_info, Actor, ConfigStore, EditableSurface,
    LockKeys, LockKind, LockRecord, LockScope, MemoryConfigStore, SectionEditabilityController,
};
use std::sync::{Arc, Mutex};

fn alice() -> Actor {
    Actor::new("u1", "Alice")
}

fn all_scopes() -> Vec<LockScope> {
    vec![
        LockScope::Document,
        LockScope::section("intro"),
        LockScope::section("doc"),
    ]
}

#[test]
fn test_untouched_store_reads_inactive() {
    let store = MemoryConfigStore::new();

    for kind in LockKind::ALL {
        for scope in all_scopes() {
            let record = read_lock(&store, kind, &scope);
            assert!(!record.active);
            assert_eq!(record, LockRecord::inactive());
        }
    }
}

#[test]
fn test_activate_then_read_everywhere() {
    for kind in LockKind::ALL {
        for scope in all_scopes() {
            let store = MemoryConfigStore::new();
            let before = Utc::now();

            set_lock_info(&store, kind, true, &alice(), &scope);

            let record = read_lock(&store, kind, &scope);
            assert!(record.active);
            assert_eq!(record.holder_id.as_deref(), Some("u1"));
            assert_eq!(record.holder_name.as_deref(), Some("Alice"));

            // Millisecond truncation can put the stored time just before `before`
            let acquired = record.acquired_at.expect("timestamp written");
            assert!(acquired >= before - Duration::milliseconds(1));
            assert!(acquired <= Utc::now());
        }
    }
}

#[test]
fn test_activate_twice_is_idempotent() {
    let store = MemoryConfigStore::new();
    let scope = LockScope::section("intro");

    set_lock_info(&store, LockKind::UserLock, true, &alice(), &scope);
    let first = read_lock(&store, LockKind::UserLock, &scope);
    set_lock_info(&store, LockKind::UserLock, true, &alice(), &scope);
    let second = read_lock(&store, LockKind::UserLock, &scope);

    assert_eq!(first.active, second.active);
    assert_eq!(first.holder_id, second.holder_id);
    assert_eq!(first.holder_name, second.holder_name);
}

#[test]
fn test_activate_release_round_trip() {
    for kind in LockKind::ALL {
        for scope in all_scopes() {
            let store = MemoryConfigStore::new();

            set_lock_info(&store, kind, true, &alice(), &scope);
            set_lock_info(&store, kind, false, &alice(), &scope);

            assert_eq!(read_lock(&store, kind, &scope), LockRecord::inactive());
        }
    }
}

#[test]
fn test_document_user_lock_excludes_ai() {
    let store = MemoryConfigStore::new();
    set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::Document);

    assert!(!can_activate(&store, LockKind::AiEdit, &LockScope::Document));
    assert!(!can_activate(&store, LockKind::AiEdit, &LockScope::section("s1")));
}

#[test]
fn test_section_locks_are_independent() {
    let store = MemoryConfigStore::new();
    let s1 = LockScope::section("s1");
    let s2 = LockScope::section("s2");

    set_lock_info(&store, LockKind::UserLock, true, &alice(), &s1);

    assert!(can_activate(&store, LockKind::UserLock, &s2));
    assert!(is_editable(&store, &s2));
    assert!(!is_editable(&store, &s1));
    assert!(!can_activate(&store, LockKind::AiEdit, &s1));
}

#[test]
fn test_document_lock_scenario() {
    let store = MemoryConfigStore::new();
    let intro = LockScope::section("intro");

    // Acquire the document lock
    set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::Document);

    assert!(!is_editable(&store, &intro));
    assert_eq!(
        read_lock(&store, LockKind::UserLock, &LockScope::Document)
            .holder_name
            .as_deref(),
        Some("Alice")
    );
    assert!(!can_activate(&store, LockKind::AiEdit, &LockScope::Document));
    // Same kind is blocked too once the document is locked
    assert!(!can_activate(&store, LockKind::UserLock, &intro));

    // Release it
    set_lock_info(&store, LockKind::UserLock, false, &alice(), &LockScope::Document);

    assert!(is_editable(&store, &intro));
    for kind in LockKind::ALL {
        assert!(can_activate(&store, kind, &intro));
        assert!(can_activate(&store, kind, &LockScope::section("outro")));
    }
}

#[test]
fn test_racing_writers_leave_mixed_record_until_settled() {
    let store = MemoryConfigStore::new();
    let keys = LockKeys::new(LockKind::UserLock, &LockScope::Document);
    let bob = Actor::new("u2", "Bob");

    // Alice's full record lands, then only the first two of Bob's writes
    set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::Document);
    store.set(&keys.active, Some(true.into()));
    store.set(&keys.holder_id, Some(bob.id.as_str().into()));

    let mixed = read_lock(&store, LockKind::UserLock, &LockScope::Document);
    assert!(mixed.active);
    assert_eq!(mixed.holder_id.as_deref(), Some("u2"));
    assert_eq!(mixed.holder_name.as_deref(), Some("Alice"));

    // Remaining writes arrive and the record converges on Bob
    set_lock_info(&store, LockKind::UserLock, true, &bob, &LockScope::Document);
    let settled = read_lock(&store, LockKind::UserLock, &LockScope::Document);
    assert_eq!(settled.holder_name.as_deref(), Some("Bob"));
}

#[derive(Clone, Default)]
struct Surface {
    editable: Arc<Mutex<Option<bool>>>,
}

impl EditableSurface for Surface {
    fn set_editable(&mut self, editable: bool) {
        *self.editable.lock().unwrap() = Some(editable);
    }
}

#[test]
fn test_controllers_follow_document_and_section_locks() {
    let store = MemoryConfigStore::new();
    let intro = SectionEditabilityController::mount(store.clone(), LockScope::section("intro"));
    let outro = SectionEditabilityController::mount(store.clone(), LockScope::section("outro"));

    let intro_surface = Surface::default();
    let outro_surface = Surface::default();
    intro.attach_surface(Box::new(intro_surface.clone()));
    outro.attach_surface(Box::new(outro_surface.clone()));

    set_lock_info(&store, LockKind::AiEdit, true, &alice(), &LockScope::section("intro"));
    assert_eq!(*intro_surface.editable.lock().unwrap(), Some(false));
    assert_eq!(*outro_surface.editable.lock().unwrap(), Some(true));

    set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::Document);
    assert_eq!(*outro_surface.editable.lock().unwrap(), Some(false));
    assert_eq!(
        outro.view().banner.as_deref(),
        Some("Document locked by Alice")
    );

    set_lock_info(&store, LockKind::UserLock, false, &alice(), &LockScope::Document);
    set_lock_info(&store, LockKind::AiEdit, false, &alice(), &LockScope::section("intro"));
    assert_eq!(*intro_surface.editable.lock().unwrap(), Some(true));
    assert_eq!(*outro_surface.editable.lock().unwrap(), Some(true));
}
