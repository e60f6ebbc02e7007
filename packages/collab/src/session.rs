//! # Collaboration Sessions
//!
//! Relays config-map updates between the clients editing one document.
//! The session's own copy is authoritative and synced from creation, so a
//! newly connected client can be brought up to date with a delta.

use crate::config::CollabConfig;
use crate::document::CollabDocument;
use crate::errors::{CollabError, CollabResult};
use coedit_locks::ChangedKeys;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Client connection in a collaboration session.
#[derive(Clone)]
pub struct CollabClient {
    pub client_id: String,
    pub sender: tokio::sync::mpsc::Sender<CollabBroadcast>,
}

/// Broadcast message to collaboration clients.
#[derive(Clone, Debug, PartialEq)]
pub enum CollabBroadcast {
    /// Remote update from another client
    RemoteUpdate {
        update: Vec<u8>,
        origin_client_id: String,
    },
    /// Config keys changed by that update
    KeysChanged {
        keys: Vec<String>,
        origin_client_id: String,
    },
}

/// A collaboration session for a single document.
pub struct CollabSession {
    pub document_id: String,
    pub document: CollabDocument,
    pub clients: Vec<CollabClient>,
}

impl CollabSession {
    pub fn new(document_id: String, namespace: &str) -> Self {
        let mut document = CollabDocument::with_namespace(namespace);
        document.mark_synced();
        Self {
            document_id,
            document,
            clients: Vec::new(),
        }
    }

    /// Add a client to the session.
    pub fn add_client(&mut self, client: CollabClient) {
        // Remove any existing client with same ID
        self.clients.retain(|c| c.client_id != client.client_id);
        tracing::info!(document = %self.document_id, client = %client.client_id, "Client joined");
        self.clients.push(client);
    }

    /// Remove a client from the session.
    pub fn remove_client(&mut self, client_id: &str) {
        self.clients.retain(|c| c.client_id != client_id);
        tracing::info!(document = %self.document_id, client = %client_id, "Client left");
    }

    /// Delta a client needs given its state vector
    pub fn sync_client(&self, state_vector: &[u8]) -> CollabResult<Vec<u8>> {
        self.document.encode_delta(state_vector)
    }

    /// Apply a client's update and relay it to every other client.
    pub async fn apply_client_update(
        &mut self,
        client_id: &str,
        update: Vec<u8>,
    ) -> CollabResult<ChangedKeys> {
        let changed = self.document.apply_update(&update)?;

        self.broadcast(
            CollabBroadcast::RemoteUpdate {
                update,
                origin_client_id: client_id.to_string(),
            },
            Some(client_id),
        )
        .await;

        if !changed.is_empty() {
            self.broadcast(
                CollabBroadcast::KeysChanged {
                    keys: changed.iter().cloned().collect(),
                    origin_client_id: client_id.to_string(),
                },
                Some(client_id),
            )
            .await;
        }

        Ok(changed)
    }

    /// Broadcast an update to all clients except the origin.
    pub async fn broadcast(&self, msg: CollabBroadcast, exclude_client: Option<&str>) {
        for client in &self.clients {
            if Some(client.client_id.as_str()) == exclude_client {
                continue;
            }
            if client.sender.send(msg.clone()).await.is_err() {
                tracing::debug!(client = %client.client_id, "Dropping broadcast to disconnected client");
            }
        }
    }

    /// Get number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

/// Manager for all collaboration sessions.
pub struct SessionManager {
    namespace: String,
    sessions: RwLock<HashMap<String, Arc<tokio::sync::RwLock<CollabSession>>>>,
}

impl SessionManager {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Manager for the namespace named in `config`
    pub fn from_config(config: &CollabConfig) -> Self {
        Self::new(config.namespace.clone())
    }

    /// Session for the document named in `config`
    pub fn session_for(&self, config: &CollabConfig) -> Arc<tokio::sync::RwLock<CollabSession>> {
        self.get_or_create_session(&config.document_id)
    }

    /// Get or create a session for a document.
    pub fn get_or_create_session(&self, document_id: &str) -> Arc<tokio::sync::RwLock<CollabSession>> {
        // Try read lock first
        if let Some(session) = self.read_sessions().get(document_id) {
            return session.clone();
        }

        // Need to create - acquire write lock
        let mut sessions = self.write_sessions();

        // Double-check (another thread may have created it)
        if let Some(session) = sessions.get(document_id) {
            return session.clone();
        }

        let session = Arc::new(tokio::sync::RwLock::new(CollabSession::new(
            document_id.to_string(),
            &self.namespace,
        )));
        sessions.insert(document_id.to_string(), session.clone());
        tracing::info!(document = %document_id, "Created collaboration session");
        session
    }

    /// Get session if it exists.
    pub fn get_session(&self, document_id: &str) -> CollabResult<Arc<tokio::sync::RwLock<CollabSession>>> {
        self.read_sessions()
            .get(document_id)
            .cloned()
            .ok_or_else(|| CollabError::SessionNotFound(document_id.to_string()))
    }

    /// Remove a session (when all clients disconnect).
    pub fn remove_session(&self, document_id: &str) {
        self.write_sessions().remove(document_id);
    }

    pub fn session_count(&self) -> usize {
        self.read_sessions().len()
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<tokio::sync::RwLock<CollabSession>>>> {
        self.sessions.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<tokio::sync::RwLock<CollabSession>>>> {
        self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
