//! # Shared Config Store
//!
//! The lock protocol sits on a replicated string-keyed map it does not own.
//! [`ConfigStore`] is that map's surface: get, set and a change subscription
//! reporting which keys a mutation batch touched.
//!
//! Implementations:
//! - [`MemoryConfigStore`]: local only, one batch per `set`, plus manual
//!   [`MemoryConfigStore::notify`] for driving observers in tests
//! - `coedit_collab::YrsConfigStore`: backed by a Yjs map

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// A primitive value stored under one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Text(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s),
            ConfigValue::Bool(_) => None,
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Text(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Text(s.to_string())
    }
}

/// Keys changed by one mutation batch
pub type ChangedKeys = BTreeSet<String>;

/// Callback invoked after every mutation batch
pub type ObserverFn = dyn Fn(&ChangedKeys) + Send + Sync;

/// Replicated key-value map consumed by the lock protocol
///
/// `set(key, None)` stores the absent value; keys are never removed, and
/// readers treat a missing key and an absent value the same way.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<ConfigValue>;

    fn set(&self, key: &str, value: Option<ConfigValue>);

    /// Register `callback` for every subsequent batch. The callback stays
    /// attached until the returned [`Subscription`] is dropped.
    fn observe(&self, callback: Box<ObserverFn>) -> Subscription;
}

/// Handle keeping an observer attached
#[must_use = "dropping a Subscription detaches its observer"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Detach now instead of on drop
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

#[derive(Default)]
struct Observers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Arc<ObserverFn>)>>,
}

/// Observer bookkeeping shared by store implementations
///
/// Dispatch snapshots the callback list and releases the lock before calling
/// anything, so observers may read or write the store they observe.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Arc<Observers>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: Box<ObserverFn>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, Arc::from(callback)));

        let weak: Weak<Observers> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .callbacks
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .retain(|(existing, _)| *existing != id);
            }
        })
    }

    pub fn dispatch(&self, changed: &ChangedKeys) {
        if changed.is_empty() {
            return;
        }

        let callbacks: Vec<Arc<ObserverFn>> = self
            .inner
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();

        for callback in callbacks {
            callback(changed);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory config map. Clones share the same entries and observers.
#[derive(Clone, Default)]
pub struct MemoryConfigStore {
    entries: Arc<Mutex<HashMap<String, Option<ConfigValue>>>>,
    observers: ObserverRegistry,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire observers for `keys` without changing anything
    pub fn notify<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let changed: ChangedKeys = keys.into_iter().map(Into::into).collect();
        self.observers.dispatch(&changed);
    }

    /// Write without notifying, to stage a peer's half-delivered update
    pub fn set_silently(&self, key: &str, value: Option<ConfigValue>) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
    }

    /// Whether `key` has ever been written, absent values included
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(key)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
            .flatten()
    }

    fn set(&self, key: &str, value: Option<ConfigValue>) {
        self.set_silently(key, value);
        self.notify([key]);
    }

    fn observe(&self, callback: Box<ObserverFn>) -> Subscription {
        self.observers.subscribe(callback)
    }
}
