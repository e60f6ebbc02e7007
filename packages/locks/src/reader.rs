//! # Lock State Reader
//!
//! Rebuilds a [`LockRecord`] from its four keys. Missing keys are normal
//! input: an untouched store reads as inactive everywhere.

use crate::keys::LockKeys;
use crate::model::{LockKind, LockRecord, LockScope};
use crate::store::{ConfigStore, ConfigValue};
use crate::LockError;
use chrono::{DateTime, Utc};

/// Read the current record for (`kind`, `scope`).
///
/// The store must already be synced. Holder fields are ignored whenever
/// `active` is missing or false, so stale values never leak into an
/// inactive record.
pub fn read_lock<S>(store: &S, kind: LockKind, scope: &LockScope) -> LockRecord
where
    S: ConfigStore + ?Sized,
{
    let keys = LockKeys::new(kind, scope);

    let active = match store.get(&keys.active) {
        Some(ConfigValue::Bool(active)) => active,
        Some(other) => {
            tracing::warn!(key = %keys.active, value = ?other, "Non-boolean lock flag, treating as inactive");
            false
        }
        None => false,
    };

    if !active {
        return LockRecord::inactive();
    }

    LockRecord {
        active,
        holder_id: read_text(store, &keys.holder_id),
        holder_name: read_text(store, &keys.holder_name),
        acquired_at: read_text(store, &keys.acquired_at).and_then(|raw| {
            parse_timestamp(&raw)
                .map_err(|e| tracing::warn!(key = %keys.acquired_at, "{}", e))
                .ok()
        }),
    }
}

/// Whether (`kind`, `scope`) is active, without reading holder fields
pub fn is_active<S>(store: &S, kind: LockKind, scope: &LockScope) -> bool
where
    S: ConfigStore + ?Sized,
{
    let keys = LockKeys::new(kind, scope);
    matches!(store.get(&keys.active), Some(ConfigValue::Bool(true)))
}

fn read_text<S>(store: &S, key: &str) -> Option<String>
where
    S: ConfigStore + ?Sized,
{
    match store.get(key)? {
        ConfigValue::Text(text) => Some(text),
        ConfigValue::Bool(_) => None,
    }
}

/// Parse an ISO-8601 acquisition time as written by any peer
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, LockError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| LockError::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
