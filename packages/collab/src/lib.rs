//! # Coedit Collab
//!
//! Yjs-backed shared config map for the lock protocol in `coedit-locks`.
//!
//! ## Architecture
//!
//! ```text
//! peer A                       session (authoritative copy)           peer B
//! CollabDocument ── update ──→ CollabSession::apply_client_update ──→ CollabDocument
//!   └─ YrsConfigStore                                                   └─ controllers recompute
//! ```
//!
//! The replication itself (merging, per-key convergence) is done by `yrs`.
//! Lock records are written as four independent map entries, so peers can
//! briefly see a half-written record while updates are in flight.

mod config;
mod document;
mod errors;
mod sections;
mod session;

pub use config::{CollabConfig, DEFAULT_CONFIG_NAME, DEFAULT_DOCUMENT_ID};
pub use document::{CollabDocument, YrsConfigStore, DEFAULT_NAMESPACE};
pub use errors::{CollabError, CollabResult};
pub use sections::SectionedDocument;
pub use session::{CollabBroadcast, CollabClient, CollabSession, SessionManager};
