//! # Lock Controls
//!
//! Derives what the Lock/Unlock and Start AI/Stop AI controls should show,
//! and performs the matching writes.
//!
//! ```text
//! exact (kind, scope) active  → Release
//! can_activate                → Acquire
//! otherwise                   → Disabled
//! ```

use crate::model::{Actor, DocumentState, Holder, LockKind, LockScope, SectionState};
use crate::policy::{can_activate, document_state, section_state};
use crate::reader::{is_active, read_lock};
use crate::store::ConfigStore;
use crate::writer::set_lock_info;
use serde::Serialize;

/// What a lock control offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LockControl {
    /// Enabled; pressing it acquires the lock
    Acquire,

    /// The lock is held; pressing it releases the lock
    Release,

    /// Acquisition is currently not admitted
    Disabled,
}

/// Outcome of an acquisition attempt. Denial is a normal result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    Denied,
}

impl Admission {
    pub fn is_granted(self) -> bool {
        self == Admission::Granted
    }
}

pub fn control_state<S>(store: &S, kind: LockKind, scope: &LockScope) -> LockControl
where
    S: ConfigStore + ?Sized,
{
    if is_active(store, kind, scope) {
        LockControl::Release
    } else if can_activate(store, kind, scope) {
        LockControl::Acquire
    } else {
        LockControl::Disabled
    }
}

/// The "locked by X" message for `scope`, if anything blocks it.
///
/// Document locks take precedence over section locks.
pub fn banner<S>(store: &S, scope: &LockScope) -> Option<String>
where
    S: ConfigStore + ?Sized,
{
    let section = match scope {
        LockScope::Section(_) => Some(section_state(store, scope)),
        LockScope::Document => None,
    };
    banner_for(&document_state(store), section.as_ref())
}

/// Banner text for already-derived states. `section` is `None` for the
/// document scope.
pub fn banner_for(document: &DocumentState, section: Option<&SectionState>) -> Option<String> {
    let by = |holder: &Option<Holder>| {
        holder
            .as_ref()
            .map(|h| format!(" by {}", h.name))
            .unwrap_or_default()
    };

    match document {
        DocumentState::DocUserLocked(holder) => {
            return Some(format!("Document locked{}", by(holder)))
        }
        DocumentState::DocAiLocked(holder) => {
            return Some(format!("AI is editing the document{}", by(holder)))
        }
        DocumentState::DocUnlocked => {}
    }

    match section? {
        SectionState::UserLocked(holder) => Some(format!("Section locked{}", by(holder))),
        SectionState::AiLocked(holder) => Some(format!("AI is editing this section{}", by(holder))),
        SectionState::Unlocked => None,
    }
}

/// Lock actions performed on behalf of one local actor
#[derive(Clone)]
pub struct LockActions<S> {
    store: S,
    actor: Actor,
}

impl<S> LockActions<S>
where
    S: ConfigStore + Clone,
{
    pub fn new(store: S, actor: Actor) -> Self {
        Self { store, actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Acquire if admitted. Re-acquiring a lock this actor already holds
    /// re-sends the record; a lock held by someone else is never taken over.
    pub fn acquire(&self, kind: LockKind, scope: &LockScope) -> Admission {
        let current = read_lock(&self.store, kind, scope);
        let admitted = if current.active {
            current.is_held_by(&self.actor.id)
        } else {
            can_activate(&self.store, kind, scope)
        };
        if !admitted {
            tracing::debug!(
                %kind,
                %scope,
                actor = %self.actor.id,
                holder = ?current.holder_id,
                "Lock admission denied"
            );
            return Admission::Denied;
        }
        set_lock_info(&self.store, kind, true, &self.actor, scope);
        Admission::Granted
    }

    /// Release regardless of who holds the lock
    pub fn release(&self, kind: LockKind, scope: &LockScope) {
        set_lock_info(&self.store, kind, false, &self.actor, scope);
    }

    /// Press the control: release if held, acquire if admitted.
    /// Returns the control state after the press.
    pub fn toggle(&self, kind: LockKind, scope: &LockScope) -> LockControl {
        match control_state(&self.store, kind, scope) {
            LockControl::Release => self.release(kind, scope),
            LockControl::Acquire => {
                self.acquire(kind, scope);
            }
            LockControl::Disabled => {}
        }
        control_state(&self.store, kind, scope)
    }

    /// Start an AI pass on `scope`. `None` if the lock is not admitted.
    pub fn start_ai_edit(&self, scope: LockScope) -> Option<AiEditGuard<S>> {
        if is_active(&self.store, LockKind::AiEdit, &scope)
            || !can_activate(&self.store, LockKind::AiEdit, &scope)
        {
            return None;
        }
        set_lock_info(&self.store, LockKind::AiEdit, true, &self.actor, &scope);
        Some(AiEditGuard {
            store: self.store.clone(),
            actor: self.actor.clone(),
            scope,
            released: false,
        })
    }
}

/// Holds the `AiEdit` lock for the duration of one AI pass
///
/// The lock is released when the guard is finished or dropped, so a
/// cancelled or failed generation cannot leave the scope locked.
pub struct AiEditGuard<S>
where
    S: ConfigStore,
{
    store: S,
    actor: Actor,
    scope: LockScope,
    released: bool,
}

impl<S> AiEditGuard<S>
where
    S: ConfigStore,
{
    pub fn scope(&self) -> &LockScope {
        &self.scope
    }

    /// Stop the AI pass now
    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            set_lock_info(&self.store, LockKind::AiEdit, false, &self.actor, &self.scope);
        }
    }
}

impl<S> Drop for AiEditGuard<S>
where
    S: ConfigStore,
{
    fn drop(&mut self) {
        self.release();
    }
}
