//! # Lock Key Namespace
//!
//! The shared map only holds primitive values, so each lock record is
//! flattened into four dotted keys:
//!
//! ```text
//! doc.<kind>.<field>                  Document scope
//! sections.<sectionId>.<kind>.<field> Section scope
//! ```
//!
//! Every key the protocol touches is built here.

use crate::model::{LockKind, LockScope};
use std::collections::BTreeSet;

/// Field names, the last segment of every lock key
pub mod field {
    pub const ACTIVE: &str = "active";
    pub const HOLDER_ID: &str = "userId";
    pub const HOLDER_NAME: &str = "userName";
    pub const ACQUIRED_AT: &str = "timestamp";
}

const DOCUMENT_PREFIX: &str = "doc";
const SECTIONS_PREFIX: &str = "sections";

/// The four storage keys backing one lock record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKeys {
    pub active: String,
    pub holder_id: String,
    pub holder_name: String,
    pub acquired_at: String,
}

impl LockKeys {
    pub fn new(kind: LockKind, scope: &LockScope) -> Self {
        let prefix = scope_prefix(scope);
        let kind = kind.wire_name();
        let key = |field: &str| format!("{}.{}.{}", prefix, kind, field);

        Self {
            active: key(field::ACTIVE),
            holder_id: key(field::HOLDER_ID),
            holder_name: key(field::HOLDER_NAME),
            acquired_at: key(field::ACQUIRED_AT),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.active.as_str(),
            self.holder_id.as_str(),
            self.holder_name.as_str(),
            self.acquired_at.as_str(),
        ]
        .into_iter()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.iter().any(|k| k == key)
    }
}

fn scope_prefix(scope: &LockScope) -> String {
    match scope {
        LockScope::Document => DOCUMENT_PREFIX.to_string(),
        LockScope::Section(id) => format!("{}.{}", SECTIONS_PREFIX, id),
    }
}

/// Every key whose change can alter the lock or editability state of `scope`.
///
/// For a section this is both document-level records plus the section's own
/// two records; for the document it is just the two document records.
pub fn relevant_keys(scope: &LockScope) -> BTreeSet<String> {
    let mut scopes = vec![LockScope::Document];
    if let LockScope::Section(_) = scope {
        scopes.push(scope.clone());
    }

    scopes
        .iter()
        .flat_map(|scope| LockKind::ALL.map(|kind| LockKeys::new(kind, scope)))
        .flat_map(|keys| keys.iter().map(str::to_string).collect::<Vec<_>>())
        .collect()
}
