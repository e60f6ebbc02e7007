//! # Lock Data Model
//!
//! Typed view over the flat lock entries kept in the shared config map.
//!
//! ```text
//! (LockKind, LockScope) → LockRecord
//!   UserLock | AiEdit      Document | Section(id)
//! ```
//!
//! Records are derived on every read; nothing here is cached.

use crate::LockError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which kind of editor has claimed a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LockKind {
    /// A human has exclusively claimed edit rights
    UserLock,

    /// An automated text-generation pass is in progress
    AiEdit,
}

impl LockKind {
    pub const ALL: [LockKind; 2] = [LockKind::UserLock, LockKind::AiEdit];

    /// The other kind. A scope never holds both at once.
    pub fn opposite(self) -> LockKind {
        match self {
            LockKind::UserLock => LockKind::AiEdit,
            LockKind::AiEdit => LockKind::UserLock,
        }
    }

    /// Name used inside storage keys
    pub fn wire_name(self) -> &'static str {
        match self {
            LockKind::UserLock => "userLock",
            LockKind::AiEdit => "aiEdit",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<LockKind> {
        match name {
            "userLock" => Some(LockKind::UserLock),
            "aiEdit" => Some(LockKind::AiEdit),
            _ => None,
        }
    }
}

impl FromStr for LockKind {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LockKind::from_wire_name(s).ok_or_else(|| LockError::UnknownKind(s.to_string()))
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Caller-supplied section identifier, unique within a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a lock applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockScope {
    /// The whole document
    Document,

    /// One named section of a multi-section document
    Section(SectionId),
}

impl LockScope {
    pub fn section(id: impl Into<SectionId>) -> Self {
        LockScope::Section(id.into())
    }

    pub fn section_id(&self) -> Option<&SectionId> {
        match self {
            LockScope::Document => None,
            LockScope::Section(id) => Some(id),
        }
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockScope::Document => f.write_str("document"),
            LockScope::Section(id) => write!(f, "section '{}'", id),
        }
    }
}

/// Identity of whoever acquires a lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Fully-written holder metadata of an active lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    pub id: String,
    pub name: String,
    pub acquired_at: DateTime<Utc>,
}

/// State of one (kind, scope) lock as read from the shared map
///
/// Holder fields are always `None` when `active` is false. When `active` is
/// true they are normally all present, but a reader can observe a record
/// mid-write from another peer with some of them still missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    pub active: bool,
    pub holder_id: Option<String>,
    pub holder_name: Option<String>,
    pub acquired_at: Option<DateTime<Utc>>,
}

impl LockRecord {
    /// The inactive record, identical to an untouched store
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Holder metadata, if the record is active and fully written
    pub fn holder(&self) -> Option<Holder> {
        if !self.active {
            return None;
        }
        match (&self.holder_id, &self.holder_name, self.acquired_at) {
            (Some(id), Some(name), Some(acquired_at)) => Some(Holder {
                id: id.clone(),
                name: name.clone(),
                acquired_at,
            }),
            _ => None,
        }
    }

    /// True when the record is active but some holder fields have not arrived yet
    pub fn is_partial(&self) -> bool {
        self.active && self.holder().is_none()
    }

    pub fn is_held_by(&self, actor_id: &str) -> bool {
        self.active && self.holder_id.as_deref() == Some(actor_id)
    }
}

/// Per-section lock state as seen by the section's editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionState {
    Unlocked,
    UserLocked(Option<Holder>),
    AiLocked(Option<Holder>),
}

/// Document-level overlay composed with every section's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentState {
    DocUnlocked,
    DocUserLocked(Option<Holder>),
    DocAiLocked(Option<Holder>),
}

impl SectionState {
    /// Derive from the section's two records. `UserLock` wins if both are
    /// set, which only happens after concurrent acquisitions race.
    pub fn from_records(user: &LockRecord, ai: &LockRecord) -> Self {
        if user.active {
            SectionState::UserLocked(user.holder())
        } else if ai.active {
            SectionState::AiLocked(ai.holder())
        } else {
            SectionState::Unlocked
        }
    }

    pub fn is_locked(&self) -> bool {
        !matches!(self, SectionState::Unlocked)
    }
}

impl DocumentState {
    pub fn from_records(user: &LockRecord, ai: &LockRecord) -> Self {
        if user.active {
            DocumentState::DocUserLocked(user.holder())
        } else if ai.active {
            DocumentState::DocAiLocked(ai.holder())
        } else {
            DocumentState::DocUnlocked
        }
    }

    pub fn is_locked(&self) -> bool {
        !matches!(self, DocumentState::DocUnlocked)
    }
}
