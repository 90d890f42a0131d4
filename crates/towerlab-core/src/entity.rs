//! Towers and units: raw records keyed by skin

use crate::rules::Catalog;
use crate::skin::SkinData;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde_json::Value as Json;
use std::sync::Arc;

/// Name of the skin every entity is expected to have
pub const DEFAULT_SKIN: &str = "Default";

/// One tower or unit with all of its skins
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    catalog: Arc<Catalog>,
    skins: IndexMap<String, SkinData>,
}

impl Entity {
    /// Build an entity from its raw `{ skin: { Defaults, Upgrades } }` record
    pub fn new(name: impl Into<String>, raw: Json, catalog: Arc<Catalog>) -> Result<Self> {
        let name = name.into();
        let skins = build_skins(&name, raw, &catalog)?;
        Ok(Self {
            name,
            catalog,
            skins,
        })
    }

    /// Entity type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the raw record and rebuild every skin
    ///
    /// Every skin is built before anything is replaced; on failure the
    /// entity is left exactly as it was.
    pub fn import_json(&mut self, raw: Json) -> Result<()> {
        match build_skins(&self.name, raw, &self.catalog) {
            Ok(skins) => {
                self.skins = skins;
                tracing::debug!(entity = %self.name, skins = self.skins.len(), "entity imported");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(entity = %self.name, error = %e, "import rejected");
                Err(e)
            }
        }
    }

    /// Parse `text` as JSON and import it
    pub fn import_json_str(&mut self, text: &str) -> Result<()> {
        let raw = serde_json::from_str(text).map_err(|e| {
            tracing::warn!(entity = %self.name, error = %e, "import rejected");
            Error::from(e)
        })?;
        self.import_json(raw)
    }

    /// The raw record, edits included
    pub fn to_json(&self) -> Json {
        Json::Object(
            self.skins
                .iter()
                .map(|(name, skin)| (name.clone(), Json::Object(skin.raw().clone())))
                .collect(),
        )
    }

    /// Get a skin by name
    pub fn skin(&self, name: &str) -> Option<&SkinData> {
        self.skins.get(name)
    }

    /// Get a mutable skin by name
    pub fn skin_mut(&mut self, name: &str) -> Option<&mut SkinData> {
        self.skins.get_mut(name)
    }

    /// Get a skin by name or fail with [`Error::SkinNotFound`]
    pub fn require_skin(&self, name: &str) -> Result<&SkinData> {
        self.skins
            .get(name)
            .ok_or_else(|| Error::SkinNotFound(format!("{}/{}", self.name, name)))
    }

    /// The `Default` skin, or the first one when there is none
    pub fn default_skin(&self) -> Option<&SkinData> {
        self.skins
            .get(DEFAULT_SKIN)
            .or_else(|| self.skins.values().next())
    }

    /// Skin names in record order
    pub fn skin_names(&self) -> impl Iterator<Item = &str> {
        self.skins.keys().map(String::as_str)
    }

    /// All skins in record order
    pub fn skins(&self) -> impl Iterator<Item = &SkinData> {
        self.skins.values()
    }
}

fn build_skins(
    entity: &str,
    raw: Json,
    catalog: &Arc<Catalog>,
) -> Result<IndexMap<String, SkinData>> {
    let Json::Object(record) = raw else {
        return Err(Error::InvalidShape(format!("{entity}: entity must be an object")));
    };
    record
        .into_iter()
        .map(|(skin, data)| {
            let skin_data = SkinData::new(entity, skin.as_str(), data, Arc::clone(catalog))?;
            Ok((skin, skin_data))
        })
        .collect()
}
