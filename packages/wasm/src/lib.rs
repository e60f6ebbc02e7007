use coedit_collab::{CollabConfig, CollabDocument, YrsConfigStore};
use coedit_locks::{
    banner, can_activate, control_state, is_editable, read_lock, set_lock_info, Actor, LockKind,
    LockRecord, LockScope, LockControl,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Everything a section's lock UI renders, in one call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionStatus {
    user_lock: LockRecord,
    ai_edit: LockRecord,
    editable: bool,
    banner: Option<String>,
    user_lock_control: LockControl,
    ai_edit_control: LockControl,
}

/// Lock protocol over a Yjs config map, driven from JavaScript
///
/// Updates are exchanged as Yjs v1 binary updates, so the same bytes can be
/// fed to and from a `Y.Doc` provider on the JS side.
#[wasm_bindgen]
pub struct LockBoard {
    document: CollabDocument,
    actor: Actor,
}

#[wasm_bindgen]
impl LockBoard {
    #[wasm_bindgen(constructor)]
    pub fn new(actor_id: &str, actor_name: &str, namespace: Option<String>) -> LockBoard {
        let document = match namespace {
            Some(namespace) => CollabDocument::with_namespace(&namespace),
            None => CollabDocument::new(),
        };
        LockBoard {
            document,
            actor: Actor::new(actor_id, actor_name),
        }
    }

    /// Build from a `coedit.config.json` body
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config_js(config_json: &str) -> Result<LockBoard, JsValue> {
        Self::from_config(config_json).map_err(to_js)
    }

    #[wasm_bindgen(js_name = markSynced)]
    pub fn mark_synced(&mut self) {
        self.document.mark_synced();
    }

    #[wasm_bindgen(getter, js_name = isSynced)]
    pub fn is_synced(&self) -> bool {
        self.document.is_synced()
    }

    /// Apply a remote update; returns the changed keys as a JSON array
    #[wasm_bindgen(js_name = applyUpdate)]
    pub fn apply_update_js(&mut self, update: &[u8]) -> Result<String, JsValue> {
        self.apply_update(update).map_err(to_js)
    }

    #[wasm_bindgen(js_name = encodeState)]
    pub fn encode_state(&self) -> Vec<u8> {
        self.document.encode_state()
    }

    #[wasm_bindgen(js_name = stateVector)]
    pub fn state_vector(&self) -> Vec<u8> {
        self.document.state_vector()
    }

    #[wasm_bindgen(js_name = encodeDelta)]
    pub fn encode_delta_js(&self, state_vector: &[u8]) -> Result<Vec<u8>, JsValue> {
        self.document
            .encode_delta(state_vector)
            .map_err(|e| to_js(e.to_string()))
    }

    /// Lock record as JSON
    #[wasm_bindgen(js_name = readLock)]
    pub fn read_lock_js(&self, kind: &str, section: Option<String>) -> Result<String, JsValue> {
        self.read_lock_json(kind, section).map_err(to_js)
    }

    #[wasm_bindgen(js_name = canActivate)]
    pub fn can_activate_js(&self, kind: &str, section: Option<String>) -> Result<bool, JsValue> {
        self.can_activate(kind, section).map_err(to_js)
    }

    #[wasm_bindgen(js_name = isEditable)]
    pub fn is_editable_js(&self, section: Option<String>) -> Result<bool, JsValue> {
        self.is_editable(section).map_err(to_js)
    }

    /// Acquire or release for the local actor. Does not check admission.
    #[wasm_bindgen(js_name = setLock)]
    pub fn set_lock_js(&self, kind: &str, active: bool, section: Option<String>) -> Result<(), JsValue> {
        self.set_lock(kind, active, section).map_err(to_js)
    }

    /// "acquire", "release" or "disabled"
    #[wasm_bindgen(js_name = controlState)]
    pub fn control_state_js(&self, kind: &str, section: Option<String>) -> Result<String, JsValue> {
        self.control_state(kind, section).map_err(to_js)
    }

    #[wasm_bindgen(js_name = sectionStatus)]
    pub fn section_status_js(&self, section: Option<String>) -> Result<String, JsValue> {
        self.section_status(section).map_err(to_js)
    }
}

impl LockBoard {
    fn from_config(config_json: &str) -> Result<LockBoard, String> {
        let config = CollabConfig::from_json(config_json).map_err(|e| e.to_string())?;
        let actor = config
            .actor
            .ok_or_else(|| "Config has no actor".to_string())?;
        Ok(LockBoard {
            document: CollabDocument::with_namespace(&config.namespace),
            actor,
        })
    }

    fn apply_update(&mut self, update: &[u8]) -> Result<String, String> {
        let changed = self.document.apply_update(update).map_err(|e| e.to_string())?;
        serde_json::to_string(&changed).map_err(|e| e.to_string())
    }

    fn store(&self) -> Result<YrsConfigStore, String> {
        self.document.synced_store().map_err(|e| e.to_string())
    }

    fn read_lock_json(&self, kind: &str, section: Option<String>) -> Result<String, String> {
        let record = read_lock(&self.store()?, parse_kind(kind)?, &scope(section));
        serde_json::to_string(&record).map_err(|e| e.to_string())
    }

    fn can_activate(&self, kind: &str, section: Option<String>) -> Result<bool, String> {
        Ok(can_activate(&self.store()?, parse_kind(kind)?, &scope(section)))
    }

    fn is_editable(&self, section: Option<String>) -> Result<bool, String> {
        Ok(is_editable(&self.store()?, &scope(section)))
    }

    fn set_lock(&self, kind: &str, active: bool, section: Option<String>) -> Result<(), String> {
        set_lock_info(&self.store()?, parse_kind(kind)?, active, &self.actor, &scope(section));
        Ok(())
    }

    fn control_state(&self, kind: &str, section: Option<String>) -> Result<String, String> {
        let control = control_state(&self.store()?, parse_kind(kind)?, &scope(section));
        Ok(control_name(control).to_string())
    }

    fn section_status(&self, section: Option<String>) -> Result<String, String> {
        let store = self.store()?;
        let scope = scope(section);
        let status = SectionStatus {
            user_lock: read_lock(&store, LockKind::UserLock, &scope),
            ai_edit: read_lock(&store, LockKind::AiEdit, &scope),
            editable: is_editable(&store, &scope),
            banner: banner(&store, &scope),
            user_lock_control: control_state(&store, LockKind::UserLock, &scope),
            ai_edit_control: control_state(&store, LockKind::AiEdit, &scope),
        };
        serde_json::to_string(&status).map_err(|e| e.to_string())
    }
}

fn parse_kind(kind: &str) -> Result<LockKind, String> {
    kind.parse::<LockKind>().map_err(|e| e.to_string())
}

fn scope(section: Option<String>) -> LockScope {
    match section {
        Some(id) => LockScope::section(id),
        None => LockScope::Document,
    }
}

fn control_name(control: LockControl) -> &'static str {
    match control {
        LockControl::Acquire => "acquire",
        LockControl::Release => "release",
        LockControl::Disabled => "disabled",
    }
}

fn to_js(message: String) -> JsValue {
    JsValue::from_str(&message)
}
