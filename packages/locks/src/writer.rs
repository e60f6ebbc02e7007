//! # Lock State Writer
//!
//! Activates or clears a lock by writing its four keys one at a time.
//!
//! The writes are independent: a peer can observe `active` before the
//! holder fields arrive, or an old holder next to a new flag while two
//! actors race. Readers tolerate that window and the next change
//! notification settles it.
//!
//! The writer trusts its caller. Admission is checked by
//! [`can_activate`](crate::can_activate) before a control is enabled,
//! not here.

use crate::keys::LockKeys;
use crate::model::{Actor, LockKind, LockScope};
use crate::store::ConfigStore;
use chrono::{DateTime, SecondsFormat, Utc};

/// Set (`kind`, `scope`) active for `actor`, or clear it.
///
/// Clearing ignores `actor` beyond logging; any peer may release any lock.
pub fn set_lock_info<S>(store: &S, kind: LockKind, active: bool, actor: &Actor, scope: &LockScope)
where
    S: ConfigStore + ?Sized,
{
    set_lock_info_at(store, kind, active, actor, scope, Utc::now());
}

/// [`set_lock_info`] with an explicit acquisition time
pub fn set_lock_info_at<S>(
    store: &S,
    kind: LockKind,
    active: bool,
    actor: &Actor,
    scope: &LockScope,
    now: DateTime<Utc>,
) where
    S: ConfigStore + ?Sized,
{
    let keys = LockKeys::new(kind, scope);

    if active {
        tracing::debug!(%kind, %scope, actor = %actor.id, "Activating lock");
        store.set(&keys.active, Some(true.into()));
        store.set(&keys.holder_id, Some(actor.id.as_str().into()));
        store.set(&keys.holder_name, Some(actor.name.as_str().into()));
        store.set(&keys.acquired_at, Some(format_timestamp(now).into()));
    } else {
        tracing::debug!(%kind, %scope, actor = %actor.id, "Releasing lock");
        store.set(&keys.active, Some(false.into()));
        store.set(&keys.holder_id, None);
        store.set(&keys.holder_name, None);
        store.set(&keys.acquired_at, None);
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-03-01T12:30:00.000Z`
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
