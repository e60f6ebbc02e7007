//! # Lock Admission Policy
//!
//! Read-only predicates over the current lock map. They encode the
//! mutual-exclusion rules:
//!
//! 1. At most one document-level lock is active.
//! 2. An active document lock blocks every section lock and every section edit.
//! 3. At most one lock per section is active.
//! 4. A section is editable iff no document lock and none of its own locks is active.
//!
//! The storage layer accepts any write; these rules hold only because
//! controls are gated on [`can_activate`]. Nothing is cached, every call
//! re-reads the store.

use crate::model::{DocumentState, LockKind, LockScope, SectionState};
use crate::reader::{is_active, read_lock};
use crate::store::ConfigStore;

/// Whether `kind` may be acquired on `scope` right now.
///
/// Any active document lock denies everything, regardless of kind. Within a
/// section only the opposite kind blocks. A lock that is already active for
/// the exact (kind, scope) is not checked here; controls turn into a release
/// action in that case (see [`control_state`](crate::control_state)).
pub fn can_activate<S>(store: &S, kind: LockKind, scope: &LockScope) -> bool
where
    S: ConfigStore + ?Sized,
{
    if document_locked(store) {
        return false;
    }

    match scope {
        LockScope::Section(_) => !is_active(store, kind.opposite(), scope),
        LockScope::Document => true,
    }
}

/// Whether the editor for `scope` should accept input.
///
/// For [`LockScope::Document`] only the document locks count.
pub fn is_editable<S>(store: &S, scope: &LockScope) -> bool
where
    S: ConfigStore + ?Sized,
{
    if document_locked(store) {
        return false;
    }

    match scope {
        LockScope::Section(_) => !LockKind::ALL
            .into_iter()
            .any(|kind| is_active(store, kind, scope)),
        LockScope::Document => true,
    }
}

/// [`is_editable`] over already-derived states. `section` is `None` for the
/// document scope.
pub fn editable_for(document: &DocumentState, section: Option<&SectionState>) -> bool {
    !document.is_locked() && !section.is_some_and(SectionState::is_locked)
}

/// Whether either document-level lock is active
pub fn document_locked<S>(store: &S) -> bool
where
    S: ConfigStore + ?Sized,
{
    LockKind::ALL
        .into_iter()
        .any(|kind| is_active(store, kind, &LockScope::Document))
}

pub fn document_state<S>(store: &S) -> DocumentState
where
    S: ConfigStore + ?Sized,
{
    DocumentState::from_records(
        &read_lock(store, LockKind::UserLock, &LockScope::Document),
        &read_lock(store, LockKind::AiEdit, &LockScope::Document),
    )
}

pub fn section_state<S>(store: &S, scope: &LockScope) -> SectionState
where
    S: ConfigStore + ?Sized,
{
    SectionState::from_records(
        &read_lock(store, LockKind::UserLock, scope),
        &read_lock(store, LockKind::AiEdit, scope),
    )
}
