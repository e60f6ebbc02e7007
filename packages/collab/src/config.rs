use crate::document::DEFAULT_NAMESPACE;
use crate::errors::CollabResult;
use coedit_locks::Actor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "coedit.config.json";
pub const DEFAULT_DOCUMENT_ID: &str = "default";

/// Collaboration configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollabConfig {
    /// Top-level shared map holding the lock keys
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Document the sections belong to
    #[serde(default = "default_document_id")]
    pub document_id: String,

    /// Section identifiers, in display order
    #[serde(default)]
    pub sections: Vec<String>,

    /// Local actor used when acquiring locks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Actor>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_document_id() -> String {
    DEFAULT_DOCUMENT_ID.to_string()
}

impl CollabConfig {
    /// Load config from a directory
    pub fn load(dir: impl AsRef<Path>) -> CollabResult<Self> {
        let config_path = Self::path_in(dir);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: CollabConfig = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "Loaded collaboration config");
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(CollabConfig::default())
        }
    }

    /// Parse config from a JSON string
    pub fn from_json(json: &str) -> CollabResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn path_in(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(DEFAULT_CONFIG_NAME)
    }
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            document_id: default_document_id(),
            sections: vec![],
            actor: None,
        }
    }
}
