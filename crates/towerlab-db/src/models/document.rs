//! Raw entity documents.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// One raw entity catalog, stored verbatim as JSON text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredDocument {
    /// Primary key - storage key of the owning manager.
    #[primary_key]
    pub key: String,
    /// JSON text of the catalog.
    pub json: String,
}

impl StoredDocument {
    /// Encode a JSON record.
    pub fn from_json(key: impl Into<String>, value: &Json) -> serde_json::Result<Self> {
        Ok(Self {
            key: key.into(),
            json: serde_json::to_string(value)?,
        })
    }

    /// Decode the JSON record.
    pub fn to_json(&self) -> serde_json::Result<Json> {
        serde_json::from_str(&self.json)
    }
}
