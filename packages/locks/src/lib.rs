//! # Coedit Locks
//!
//! Advisory section/document locking for collaboratively edited documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ controls / controller: UI-facing state      │
//! │  - Lock / Unlock / Start AI / Stop AI       │
//! │  - per-section editable flag + banner       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ policy: can_activate / is_editable          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ reader / writer: LockRecord ↔ 4 flat keys   │
//! │ keys: doc.<kind>.<field>,                   │
//! │       sections.<id>.<kind>.<field>          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ ConfigStore: replicated key-value map       │
//! │  (in-memory here, Yjs in coedit-collab)     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Advisory**: the store accepts any write; exclusion comes from gating controls
//! 2. **Not transactional**: a lock is four independent writes, readers tolerate partial records
//! 3. **Derived state**: nothing is cached, every decision re-reads the store
//! 4. **Permissive release**: any peer may clear any lock
//!
//! ## Usage
//!
//! ```rust
//! use coedit_locks::{
//!     can_activate, is_editable, read_lock, set_lock_info, Actor, LockKind, LockScope,
//!     MemoryConfigStore,
//! };
//!
//! let store = MemoryConfigStore::new();
//! let alice = Actor::new("u1", "Alice");
//!
//! set_lock_info(&store, LockKind::UserLock, true, &alice, &LockScope::Document);
//!
//! assert!(!is_editable(&store, &LockScope::section("intro")));
//! assert!(!can_activate(&store, LockKind::AiEdit, &LockScope::Document));
//! assert_eq!(
//!     read_lock(&store, LockKind::UserLock, &LockScope::Document).holder_name.as_deref(),
//!     Some("Alice")
//! );
//! ```

mod controller;
mod controls;
mod errors;
pub mod keys;
mod model;
mod policy;
mod reader;
mod store;
mod writer;

pub use controller::{EditableSurface, LockViewHandle, SectionEditabilityController, SectionLockView};
pub use controls::{banner, banner_for, control_state, Admission, AiEditGuard, LockActions, LockControl};
pub use errors::LockError;
pub use keys::{relevant_keys, LockKeys};
pub use model::{
    Actor, DocumentState, Holder, LockKind, LockRecord, LockScope, SectionId, SectionState,
};
pub use policy::{
    can_activate, document_locked, document_state, editable_for, is_editable, section_state,
};
pub use reader::{is_active, parse_timestamp, read_lock};
pub use store::{
    ChangedKeys, ConfigStore, ConfigValue, MemoryConfigStore, ObserverFn, ObserverRegistry,
    Subscription,
};
pub use writer::{format_timestamp, set_lock_info, set_lock_info_at};
