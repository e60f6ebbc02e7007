//! # Collaborative Config Document
//!
//! A Yjs document holding the flat lock map, plus the [`ConfigStore`]
//! handle the lock protocol reads and writes through.
//!
//! ## Lifecycle
//!
//! ```text
//! new → apply_update(initial state) → mark_synced → store() → Some(handle)
//! ```
//!
//! Before [`CollabDocument::mark_synced`] the map may still be missing
//! remote state, so [`CollabDocument::store`] returns `None` and no lock
//! can be read too early.
//!
//! ## Notifications
//!
//! Observers run after the transaction that caused the change has
//! committed, so they can read the map themselves. A local `set` is one
//! transaction and one batch; a remote update is one batch holding every
//! key whose value it changed.

use crate::errors::{CollabError, CollabResult};
use coedit_locks::{ChangedKeys, ConfigStore, ConfigValue, ObserverFn, ObserverRegistry, Subscription};
use std::collections::HashMap;
use std::sync::Arc;
use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{Any, Doc, Map, MapRef, Out, ReadTxn, StateVector, Transact, Update};

/// Name of the top-level map used when none is configured
pub const DEFAULT_NAMESPACE: &str = "docConfig";

struct SharedMap {
    doc: Doc,
    map: MapRef,
    observers: ObserverRegistry,
}

impl SharedMap {
    fn snapshot(&self) -> HashMap<String, Option<ConfigValue>> {
        let txn = self.doc.transact();
        self.map
            .iter(&txn)
            .map(|(key, value)| (key.to_string(), from_out(key, value)))
            .collect()
    }
}

/// A Yjs-backed shared config document for one editing session
pub struct CollabDocument {
    shared: Arc<SharedMap>,
    namespace: String,
    synced: bool,
    version: u64,
}

impl CollabDocument {
    /// Create an empty document using the default map name
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(namespace: &str) -> Self {
        Self::from_doc(Doc::new(), namespace)
    }

    /// Create with a fixed Yjs client id, for deterministic conflict resolution in tests
    pub fn with_client_id(client_id: u64, namespace: &str) -> Self {
        Self::from_doc(Doc::with_client_id(client_id), namespace)
    }

    fn from_doc(doc: Doc, namespace: &str) -> Self {
        let map = doc.get_or_insert_map(namespace);
        Self {
            shared: Arc::new(SharedMap {
                doc,
                map,
                observers: ObserverRegistry::new(),
            }),
            namespace: namespace.to_string(),
            synced: false,
            version: 0,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Record that the initial sync with the backend has completed
    pub fn mark_synced(&mut self) {
        if !self.synced {
            tracing::info!(namespace = %self.namespace, "Config document synced");
        }
        self.synced = true;
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Handle for the lock protocol, available once synced
    pub fn store(&self) -> Option<YrsConfigStore> {
        self.synced.then(|| YrsConfigStore {
            shared: self.shared.clone(),
        })
    }

    /// Like [`store`](Self::store), as an error for callers that propagate
    pub fn synced_store(&self) -> CollabResult<YrsConfigStore> {
        self.store().ok_or(CollabError::NotSynced)
    }

    /// Get the current state vector (for delta sync).
    pub fn state_vector(&self) -> Vec<u8> {
        let txn = self.shared.doc.transact();
        txn.state_vector().encode_v1()
    }

    /// Encode the full document state.
    pub fn encode_state(&self) -> Vec<u8> {
        let txn = self.shared.doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }

    /// Encode delta since a given state vector.
    pub fn encode_delta(&self, state_vector: &[u8]) -> CollabResult<Vec<u8>> {
        let sv = StateVector::decode_v1(state_vector)
            .map_err(|e| CollabError::Decode(e.to_string()))?;
        let txn = self.shared.doc.transact();
        Ok(txn.encode_state_as_update_v1(&sv))
    }

    /// Apply an update from a peer and notify observers of the keys it changed.
    pub fn apply_update(&mut self, update: &[u8]) -> CollabResult<ChangedKeys> {
        let update = Update::decode_v1(update).map_err(|e| CollabError::Decode(e.to_string()))?;

        let before = self.shared.snapshot();
        {
            let mut txn = self.shared.doc.transact_mut();
            txn.apply_update(update)
                .map_err(|e| CollabError::Apply(e.to_string()))?;
        }
        let after = self.shared.snapshot();

        let changed = changed_keys(&before, &after);
        self.version += 1;
        tracing::debug!(
            namespace = %self.namespace,
            changed = changed.len(),
            version = self.version,
            "Applied remote update"
        );
        self.shared.observers.dispatch(&changed);

        Ok(changed)
    }

    /// Number of remote updates applied
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl Default for CollabDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn changed_keys(
    before: &HashMap<String, Option<ConfigValue>>,
    after: &HashMap<String, Option<ConfigValue>>,
) -> ChangedKeys {
    after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .chain(before.keys().filter(|key| !after.contains_key(*key)).cloned())
        .collect()
}

/// [`ConfigStore`] over the document's Yjs map. Clones share the document.
#[derive(Clone)]
pub struct YrsConfigStore {
    shared: Arc<SharedMap>,
}

impl ConfigStore for YrsConfigStore {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        let txn = self.shared.doc.transact();
        let value = self.shared.map.get(&txn, key)?;
        from_out(key, value)
    }

    fn set(&self, key: &str, value: Option<ConfigValue>) {
        {
            let mut txn = self.shared.doc.transact_mut();
            self.shared.map.insert(&mut txn, key, to_any(value));
        }
        let changed: ChangedKeys = [key.to_string()].into_iter().collect();
        self.shared.observers.dispatch(&changed);
    }

    fn observe(&self, callback: Box<ObserverFn>) -> Subscription {
        self.shared.observers.subscribe(callback)
    }
}

fn to_any(value: Option<ConfigValue>) -> Any {
    match value {
        Some(ConfigValue::Bool(b)) => Any::Bool(b),
        Some(ConfigValue::Text(s)) => Any::String(Arc::from(s)),
        None => Any::Null,
    }
}

fn from_out(key: &str, value: Out) -> Option<ConfigValue> {
    match value {
        Out::Any(Any::Bool(b)) => Some(ConfigValue::Bool(b)),
        Out::Any(Any::String(s)) => Some(ConfigValue::Text(s.to_string())),
        Out::Any(Any::Null) | Out::Any(Any::Undefined) => None,
        other => {
            tracing::warn!(key, value = ?other, "Unsupported config value, reading as absent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coedit_locks::{read_lock, set_lock_info, Actor, LockKind, LockScope};
    use std::sync::Mutex;

    fn synced() -> CollabDocument {
        let mut doc = CollabDocument::new();
        doc.mark_synced();
        doc
    }

    #[test]
    fn test_store_unavailable_before_sync() {
        let mut doc = CollabDocument::new();
        assert!(doc.store().is_none());
        assert!(matches!(doc.synced_store(), Err(CollabError::NotSynced)));

        doc.mark_synced();
        assert!(doc.store().is_some());
    }

    #[test]
    fn test_set_get_and_absent() {
        let doc = synced();
        let store = doc.store().unwrap();

        store.set("doc.userLock.active", Some(true.into()));
        store.set("doc.userLock.userName", Some("Alice".into()));
        assert_eq!(store.get("doc.userLock.active"), Some(ConfigValue::Bool(true)));
        assert_eq!(
            store.get("doc.userLock.userName"),
            Some(ConfigValue::Text("Alice".into()))
        );

        store.set("doc.userLock.userName", None);
        assert_eq!(store.get("doc.userLock.userName"), None);
        assert_eq!(store.get("never.written"), None);
    }

    #[test]
    fn test_observer_can_read_during_notification() {
        let doc = synced();
        let store = doc.store().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = store.clone();
        let slot = seen.clone();
        let _sub = store.observe(Box::new(move |changed| {
            for key in changed {
                slot.lock().unwrap().push((key.clone(), reader.get(key)));
            }
        }));
        store.set("k", Some("v".into()));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("k".to_string(), Some(ConfigValue::Text("v".into())))]
        );
    }

    #[test]
    fn test_lock_round_trip_through_yrs() {
        let doc = synced();
        let store = doc.store().unwrap();
        let alice = Actor::new("u1", "Alice");

        set_lock_info(&store, LockKind::AiEdit, true, &alice, &LockScope::section("s1"));
        let record = read_lock(&store, LockKind::AiEdit, &LockScope::section("s1"));
        assert!(record.active);
        assert_eq!(record.holder_name.as_deref(), Some("Alice"));
        assert!(record.acquired_at.is_some());
    }

    #[test]
    fn test_apply_update_reports_changed_keys() {
        let source = synced();
        let source_store = source.store().unwrap();
        source_store.set("a", Some(true.into()));
        source_store.set("b", Some("x".into()));

        let mut target = CollabDocument::new();
        let changed = target.apply_update(&source.encode_state()).unwrap();

        assert_eq!(changed.len(), 2);
        assert!(changed.contains("a") && changed.contains("b"));
        assert_eq!(target.version(), 1);

        // Re-applying the same state changes nothing
        let changed = target.apply_update(&source.encode_state()).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn test_decode_error() {
        let mut doc = CollabDocument::new();
        let result = doc.apply_update(&[0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(CollabError::Decode(_))));
    }

    #[test]
    fn test_delta_sync() {
        let source = synced();
        let mut target = CollabDocument::new();
        target.apply_update(&source.encode_state()).unwrap();

        source.store().unwrap().set("later", Some(true.into()));
        let delta = source.encode_delta(&target.state_vector()).unwrap();
        let changed = target.apply_update(&delta).unwrap();

        assert!(changed.contains("later"));
    }

    #[test]
    fn test_namespaces_are_separate_maps() {
        let mut config = CollabDocument::with_namespace("docConfig");
        let mut settings = CollabDocument::with_namespace("docSettings");
        config.mark_synced();
        settings.mark_synced();

        config.store().unwrap().set("k", Some(true.into()));
        let changed = settings.apply_update(&config.encode_state()).unwrap();

        assert!(changed.is_empty());
        assert_eq!(settings.store().unwrap().get("k"), None);
        assert_eq!(settings.namespace(), "docSettings");
    }
}
