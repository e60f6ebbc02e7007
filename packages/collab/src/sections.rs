//! # Sectioned Document
//!
//! One client's view of a multi-section document: the shared config
//! document, the local actor, and an editability controller per section.
//!
//! Controllers are only mounted once the document reports synced. Until
//! then [`SectionedDocument::controller`] and [`SectionedDocument::actions`]
//! return `None`, and the UI keeps its controls disabled.

use crate::config::{CollabConfig, DEFAULT_DOCUMENT_ID};
use crate::document::{CollabDocument, YrsConfigStore};
use crate::errors::CollabResult;
use coedit_locks::{
    Actor, ChangedKeys, LockActions, LockScope, SectionEditabilityController, SectionId,
};
use std::collections::BTreeMap;

pub struct SectionedDocument {
    document_id: String,
    document: CollabDocument,
    actor: Actor,
    sections: Vec<SectionId>,
    controllers: BTreeMap<SectionId, SectionEditabilityController<YrsConfigStore>>,
    document_controller: Option<SectionEditabilityController<YrsConfigStore>>,
}

impl SectionedDocument {
    pub fn new(document: CollabDocument, actor: Actor, sections: Vec<SectionId>) -> Self {
        let mut sectioned = Self {
            document_id: DEFAULT_DOCUMENT_ID.to_string(),
            document,
            actor,
            sections,
            controllers: BTreeMap::new(),
            document_controller: None,
        };
        sectioned.mount_controllers();
        sectioned
    }

    /// Build from config, falling back to `fallback_actor` when none is configured
    pub fn from_config(config: &CollabConfig, fallback_actor: Actor) -> Self {
        Self::new(
            CollabDocument::with_namespace(&config.namespace),
            config.actor.clone().unwrap_or(fallback_actor),
            config.sections.iter().cloned().map(SectionId::from).collect(),
        )
        .with_document_id(&config.document_id)
    }

    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = document_id.into();
        self
    }

    /// Key of the relay session this document syncs through
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn document(&self) -> &CollabDocument {
        &self.document
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn sections(&self) -> &[SectionId] {
        &self.sections
    }

    /// Apply a peer update. Mounted controllers recompute from the notification.
    pub fn apply_update(&mut self, update: &[u8]) -> CollabResult<ChangedKeys> {
        self.document.apply_update(update)
    }

    /// Initial sync finished; mount controllers
    pub fn mark_synced(&mut self) {
        self.document.mark_synced();
        self.mount_controllers();
    }

    pub fn is_synced(&self) -> bool {
        self.document.is_synced()
    }

    fn mount_controllers(&mut self) {
        let Some(store) = self.document.store() else {
            return;
        };

        for id in &self.sections {
            self.controllers.entry(id.clone()).or_insert_with(|| {
                SectionEditabilityController::mount(store.clone(), LockScope::Section(id.clone()))
            });
        }
        if self.document_controller.is_none() {
            self.document_controller =
                Some(SectionEditabilityController::mount(store, LockScope::Document));
        }
        tracing::debug!(sections = self.sections.len(), "Mounted section controllers");
    }

    pub fn controller(&self, id: &SectionId) -> Option<&SectionEditabilityController<YrsConfigStore>> {
        self.controllers.get(id)
    }

    /// Controller for document-wide editing (e.g. a multi-field form)
    pub fn document_controller(&self) -> Option<&SectionEditabilityController<YrsConfigStore>> {
        self.document_controller.as_ref()
    }

    /// Lock actions for the local actor
    pub fn actions(&self) -> Option<LockActions<YrsConfigStore>> {
        self.document
            .store()
            .map(|store| LockActions::new(store, self.actor.clone()))
    }

    /// Sections the local user can currently type into
    pub fn editable_sections(&self) -> Vec<SectionId> {
        self.controllers
            .iter()
            .filter(|(_, controller)| controller.is_editable())
            .map(|(id, _)| id.clone())
            .collect()
    }
}
