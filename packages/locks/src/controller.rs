//! # Section Editability Controller
//!
//! Keeps one section's editor in step with the shared lock map.
//!
//! ```text
//! store change ─→ filter by relevant keys ─→ re-read 4 records
//!                                             ├─→ is_editable → surface.set_editable
//!                                             └─→ banner / control data
//! ```
//!
//! The editing surface may not exist yet when the controller mounts (it is
//! usually built after the document syncs). The computed state is kept and
//! applied once a surface is attached.

use crate::controls::banner_for;
use crate::keys::relevant_keys;
use crate::model::{DocumentState, LockKind, LockRecord, LockScope, SectionState};
use crate::policy::editable_for;
use crate::reader::read_lock;
use crate::store::{ChangedKeys, ConfigStore, Subscription};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// The rich-text surface whose editable flag the controller drives
pub trait EditableSurface: Send {
    fn set_editable(&mut self, editable: bool);
}

/// Lock records and derived state for one section, for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionLockView {
    pub document_user_lock: LockRecord,
    pub document_ai_edit: LockRecord,
    pub section_user_lock: LockRecord,
    pub section_ai_edit: LockRecord,
    pub editable: bool,
    pub banner: Option<String>,
}

impl SectionLockView {
    /// Read the four records once and derive everything else from them
    fn read<S>(store: &S, scope: &LockScope) -> Self
    where
        S: ConfigStore + ?Sized,
    {
        let (section_user_lock, section_ai_edit) = match scope {
            LockScope::Section(_) => (
                read_lock(store, LockKind::UserLock, scope),
                read_lock(store, LockKind::AiEdit, scope),
            ),
            LockScope::Document => (LockRecord::inactive(), LockRecord::inactive()),
        };

        let mut view = Self {
            document_user_lock: read_lock(store, LockKind::UserLock, &LockScope::Document),
            document_ai_edit: read_lock(store, LockKind::AiEdit, &LockScope::Document),
            section_user_lock,
            section_ai_edit,
            editable: true,
            banner: None,
        };

        let document = view.document_state();
        let section = scope.section_id().map(|_| view.section_state());
        view.editable = editable_for(&document, section.as_ref());
        view.banner = banner_for(&document, section.as_ref());
        view
    }

    pub fn record(&self, kind: LockKind, scope: &LockScope) -> &LockRecord {
        match (scope, kind) {
            (LockScope::Document, LockKind::UserLock) => &self.document_user_lock,
            (LockScope::Document, LockKind::AiEdit) => &self.document_ai_edit,
            (LockScope::Section(_), LockKind::UserLock) => &self.section_user_lock,
            (LockScope::Section(_), LockKind::AiEdit) => &self.section_ai_edit,
        }
    }

    pub fn document_state(&self) -> DocumentState {
        DocumentState::from_records(&self.document_user_lock, &self.document_ai_edit)
    }

    pub fn section_state(&self) -> SectionState {
        SectionState::from_records(&self.section_user_lock, &self.section_ai_edit)
    }
}

struct ControllerState {
    view: SectionLockView,
    surface: Option<Box<dyn EditableSurface>>,
    applied: Option<bool>,
    recomputes: usize,
    /// Bumped on every attach/detach
    surface_epoch: u64,
}

impl ControllerState {
    fn apply(&mut self, view: SectionLockView) {
        self.view = view;
        self.recomputes += 1;
    }
}

/// Push the editable flag to the surface if it changed (or `force`).
///
/// The surface is taken out of the state for the call so it can read the
/// controller back without deadlocking. It goes back only if nothing was
/// attached or detached in the meantime.
fn sync_surface(state: &Mutex<ControllerState>, mut force: bool) {
    loop {
        let (mut surface, editable, epoch) = {
            let mut guard = lock_state(state);
            let editable = guard.view.editable;
            if !force && guard.applied == Some(editable) {
                return;
            }
            let Some(surface) = guard.surface.take() else {
                return;
            };
            guard.applied = Some(editable);
            (surface, editable, guard.surface_epoch)
        };

        surface.set_editable(editable);

        let mut guard = lock_state(state);
        if guard.surface_epoch != epoch || guard.surface.is_some() {
            return;
        }
        guard.surface = Some(surface);
        // A recompute may have landed while the surface was out
        force = false;
    }
}

/// Cheap read-only handle on a controller's current view
///
/// Safe to use from inside [`EditableSurface::set_editable`].
#[derive(Clone)]
pub struct LockViewHandle {
    state: Arc<Mutex<ControllerState>>,
}

impl LockViewHandle {
    pub fn view(&self) -> SectionLockView {
        lock_state(&self.state).view.clone()
    }

    pub fn is_editable(&self) -> bool {
        lock_state(&self.state).view.editable
    }
}

/// Mounted controller for one section (or the whole document)
///
/// Dropping it unsubscribes from the store.
pub struct SectionEditabilityController<S> {
    store: S,
    scope: LockScope,
    state: Arc<Mutex<ControllerState>>,
    _subscription: Subscription,
}

impl<S> SectionEditabilityController<S>
where
    S: ConfigStore + Clone + Send + Sync + 'static,
{
    /// Mount on a synced store and compute the initial state
    pub fn mount(store: S, scope: LockScope) -> Self {
        let state = Arc::new(Mutex::new(ControllerState {
            view: SectionLockView::read(&store, &scope),
            surface: None,
            applied: None,
            recomputes: 0,
            surface_epoch: 0,
        }));

        let relevant: BTreeSet<String> = relevant_keys(&scope);
        let subscription = {
            let reader = store.clone();
            let scope = scope.clone();
            let state = state.clone();
            store.observe(Box::new(move |changed: &ChangedKeys| {
                if changed.is_disjoint(&relevant) {
                    return;
                }
                let view = SectionLockView::read(&reader, &scope);
                tracing::debug!(%scope, editable = view.editable, "Recomputed lock state");
                lock_state(&state).apply(view);
                sync_surface(&state, false);
            }))
        };

        Self {
            store,
            scope,
            state,
            _subscription: subscription,
        }
    }

    /// Attach the editing surface and apply the current editable flag
    pub fn attach_surface(&self, surface: Box<dyn EditableSurface>) {
        {
            let mut state = lock_state(&self.state);
            state.surface = Some(surface);
            state.surface_epoch += 1;
        }
        sync_surface(&self.state, true);
    }

    /// Returns `None` while the surface is inside its own `set_editable` call
    pub fn detach_surface(&self) -> Option<Box<dyn EditableSurface>> {
        let mut state = lock_state(&self.state);
        state.applied = None;
        state.surface_epoch += 1;
        state.surface.take()
    }

    /// Re-read the store unconditionally
    pub fn refresh(&self) {
        let view = SectionLockView::read(&self.store, &self.scope);
        lock_state(&self.state).apply(view);
        sync_surface(&self.state, false);
    }

    pub fn handle(&self) -> LockViewHandle {
        LockViewHandle {
            state: self.state.clone(),
        }
    }

    pub fn view(&self) -> SectionLockView {
        lock_state(&self.state).view.clone()
    }

    pub fn is_editable(&self) -> bool {
        lock_state(&self.state).view.editable
    }

    pub fn scope(&self) -> &LockScope {
        &self.scope
    }

    /// Number of recomputations triggered since mount
    pub fn recompute_count(&self) -> usize {
        lock_state(&self.state).recomputes
    }
}

fn lock_state(state: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Actor;
    use crate::store::{ConfigValue, MemoryConfigStore, ObserverFn};
    use crate::writer::set_lock_info;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct RecordingSurface {
        calls: Arc<Mutex<Vec<bool>>>,
    }

    impl EditableSurface for RecordingSurface {
        fn set_editable(&mut self, editable: bool) {
            self.calls.lock().unwrap().push(editable);
        }
    }

    fn alice() -> Actor {
        Actor::new("u1", "Alice")
    }

    #[test]
    fn test_initial_state_on_mount() {
        let store = MemoryConfigStore::new();
        set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::section("s1"));

        let controller = SectionEditabilityController::mount(store, LockScope::section("s1"));

        assert!(!controller.is_editable());
        assert_eq!(controller.recompute_count(), 0);
        assert_eq!(
            controller.view().banner.as_deref(),
            Some("Section locked by Alice")
        );
    }

    #[test]
    fn test_state_buffered_until_surface_attached() {
        let store = MemoryConfigStore::new();
        let controller = SectionEditabilityController::mount(store.clone(), LockScope::section("s1"));

        set_lock_info(&store, LockKind::AiEdit, true, &alice(), &LockScope::section("s1"));
        assert!(!controller.is_editable());

        let surface = RecordingSurface::default();
        controller.attach_surface(Box::new(surface.clone()));
        assert_eq!(*surface.calls.lock().unwrap(), vec![false]);
    }

    #[test]
    fn test_surface_only_told_about_changes() {
        let store = MemoryConfigStore::new();
        let controller = SectionEditabilityController::mount(store.clone(), LockScope::section("s1"));
        let surface = RecordingSurface::default();
        controller.attach_surface(Box::new(surface.clone()));

        set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::Document);
        set_lock_info(&store, LockKind::UserLock, false, &alice(), &LockScope::Document);

        assert_eq!(*surface.calls.lock().unwrap(), vec![true, false, true]);
    }

    #[test]
    fn test_unrelated_sections_do_not_trigger_recompute() {
        let store = MemoryConfigStore::new();
        let controller = SectionEditabilityController::mount(store.clone(), LockScope::section("s1"));

        set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::section("s2"));
        store.set("title", Some("Quarterly report".into()));
        assert_eq!(controller.recompute_count(), 0);

        set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::section("s1"));
        assert_eq!(controller.recompute_count(), 4);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let store = MemoryConfigStore::new();
        let controller = SectionEditabilityController::mount(store.clone(), LockScope::section("s1"));
        assert_eq!(store.observer_count(), 1);

        drop(controller);
        assert_eq!(store.observer_count(), 0);
    }

    #[test]
    fn test_document_scope_controller() {
        let store = MemoryConfigStore::new();
        let controller = SectionEditabilityController::mount(store.clone(), LockScope::Document);

        set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::section("s1"));
        assert!(controller.is_editable());

        set_lock_info(&store, LockKind::AiEdit, true, &alice(), &LockScope::Document);
        assert!(!controller.is_editable());
        assert!(matches!(
            controller.view().document_state(),
            DocumentState::DocAiLocked(Some(_))
        ));
    }

    #[test]
    fn test_detach_and_reattach_reapplies() {
        let store = MemoryConfigStore::new();
        let controller = SectionEditabilityController::mount(store.clone(), LockScope::section("s1"));
        let surface = RecordingSurface::default();

        controller.attach_surface(Box::new(surface.clone()));
        assert!(controller.detach_surface().is_some());
        set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::section("s1"));
        controller.attach_surface(Box::new(surface.clone()));

        assert_eq!(*surface.calls.lock().unwrap(), vec![true, false]);
    }

    /// Reads the controller back from inside the callback
    struct ReadBackSurface {
        handle: LockViewHandle,
        seen: Arc<Mutex<Vec<(bool, Option<String>)>>>,
    }

    impl EditableSurface for ReadBackSurface {
        fn set_editable(&mut self, editable: bool) {
            let view = self.handle.view();
            assert_eq!(view.editable, self.handle.is_editable());
            self.seen.lock().unwrap().push((editable, view.banner));
        }
    }

    #[test]
    fn test_surface_can_read_controller_during_callback() {
        let store = MemoryConfigStore::new();
        let controller = SectionEditabilityController::mount(store.clone(), LockScope::section("s1"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        controller.attach_surface(Box::new(ReadBackSurface {
            handle: controller.handle(),
            seen: seen.clone(),
        }));

        set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::section("s1"));
        set_lock_info(&store, LockKind::UserLock, false, &alice(), &LockScope::section("s1"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], (true, None));
        assert_eq!(seen[1].0, false);
        assert_eq!(seen.last().map(|(editable, _)| *editable), Some(true));
        assert_eq!(seen.len(), 3);
        drop(seen);

        // Surface is back in place after the callbacks
        assert!(controller.detach_surface().is_some());
    }

    /// Counts reads so a recompute can be checked against the store
    #[derive(Clone, Default)]
    struct CountingStore {
        inner: MemoryConfigStore,
        gets: Arc<AtomicUsize>,
    }

    impl ConfigStore for CountingStore {
        fn get(&self, key: &str) -> Option<ConfigValue> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: Option<ConfigValue>) {
            self.inner.set(key, value)
        }

        fn observe(&self, callback: Box<ObserverFn>) -> Subscription {
            self.inner.observe(callback)
        }
    }

    #[test]
    fn test_view_derived_from_one_read_of_each_record() {
        let store = CountingStore::default();
        set_lock_info(&store, LockKind::UserLock, true, &alice(), &LockScope::Document);

        store.gets.store(0, Ordering::SeqCst);
        let view = SectionLockView::read(&store, &LockScope::section("s1"));

        // Four keys for the active document lock, one flag for each inactive record
        assert_eq!(store.gets.load(Ordering::SeqCst), 7);
        assert!(!view.editable);
        assert_eq!(view.banner.as_deref(), Some("Document locked by Alice"));
        assert_eq!(view.section_state(), SectionState::Unlocked);
    }
}

