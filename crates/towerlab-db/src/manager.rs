//! Entity managers
//!
//! An [`EntityManager`] owns every entity of one kind, sourced from the store
//! when a document exists under its storage key and from the built-in
//! catalog otherwise. It does no derived computation of its own.

use crate::error::{Error, Result};
use crate::store::Store;
use indexmap::IndexMap;
use serde_json::{Map, Value as Json};
use std::sync::Arc;
use towerlab_catalog::{tower_catalog, unit_catalog};
use towerlab_core::{BuffState, Catalog, Entity, EvalContext, SkinData, UnitSource, Value};

/// Storage key of the tower catalog
pub const TOWERS_KEY: &str = "towers";
/// Storage key of the unit catalog
pub const UNITS_KEY: &str = "units";

/// Built-in tower data
pub const BUILTIN_TOWERS: &str = include_str!("../data/towers.json");
/// Built-in unit data
pub const BUILTIN_UNITS: &str = include_str!("../data/units.json");

/// Where the current entities were loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Store,
    Builtin,
}

/// All entities of one kind
pub struct EntityManager {
    storage_key: String,
    store: Arc<Store>,
    catalog: Arc<Catalog>,
    builtin: &'static str,
    source: Source,
    entities: IndexMap<String, Entity>,
}

impl EntityManager {
    /// Create a manager and load its entities
    pub fn new(
        storage_key: impl Into<String>,
        store: Arc<Store>,
        catalog: Arc<Catalog>,
        builtin: &'static str,
    ) -> Result<Self> {
        let mut manager = Self {
            storage_key: storage_key.into(),
            store,
            catalog,
            builtin,
            source: Source::Builtin,
            entities: IndexMap::new(),
        };
        manager.load()?;
        Ok(manager)
    }

    /// Load from the store, falling back to the built-in data
    ///
    /// On failure the current entities are kept.
    pub fn load(&mut self) -> Result<()> {
        let (raw, source) = match self.store.load_document(&self.storage_key)? {
            Some(raw) => (raw, Source::Store),
            None => (serde_json::from_str(self.builtin)?, Source::Builtin),
        };
        self.entities = self.build(raw)?;
        self.source = source;
        tracing::info!(
            key = %self.storage_key,
            source = ?source,
            entities = self.entities.len(),
            "entities loaded"
        );
        Ok(())
    }

    /// Discard in-memory edits and load again
    pub fn reload(&mut self) -> Result<()> {
        self.load()
    }

    /// Persist the current entities, edits included
    pub fn save(&mut self) -> Result<()> {
        self.store.save_document(&self.storage_key, &self.to_json())?;
        self.source = Source::Store;
        tracing::info!(key = %self.storage_key, entities = self.entities.len(), "entities saved");
        Ok(())
    }

    /// Forget stored data and return to the built-in entities
    pub fn reset(&mut self) -> Result<()> {
        let entities = self.build(serde_json::from_str(self.builtin)?)?;
        self.store.delete_document(&self.storage_key)?;
        self.entities = entities;
        self.source = Source::Builtin;
        tracing::info!(key = %self.storage_key, "entities reset to built-in data");
        Ok(())
    }

    fn build(&self, raw: Json) -> Result<IndexMap<String, Entity>> {
        let Json::Object(record) = raw else {
            return Err(Error::Serialization(format!(
                "{}: expected an object of entities",
                self.storage_key
            )));
        };
        record
            .into_iter()
            .map(|(name, data)| {
                let entity = Entity::new(name.as_str(), data, Arc::clone(&self.catalog))?;
                Ok((name, entity))
            })
            .collect()
    }

    /// Storage key of this manager
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Where the current entities came from
    pub fn source(&self) -> Source {
        self.source
    }

    /// The catalog every entity is built with
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Get an entity by name
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Get a mutable entity by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.get_mut(name)
    }

    /// Get one skin of one entity
    pub fn skin(&self, entity: &str, skin: &str) -> Result<&SkinData> {
        self.get(entity)
            .ok_or_else(|| Error::NotFound(entity.to_string()))?
            .require_skin(skin)
            .map_err(Error::from)
    }

    /// Get one mutable skin of one entity
    pub fn skin_mut(&mut self, entity: &str, skin: &str) -> Result<&mut SkinData> {
        self.get_mut(entity)
            .ok_or_else(|| Error::NotFound(entity.to_string()))?
            .skin_mut(skin)
            .ok_or_else(|| Error::NotFound(format!("{entity}/{skin}")))
    }

    /// Entity names in catalog order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Add or replace an entity built from `raw`
    pub fn insert(&mut self, name: impl Into<String>, raw: Json) -> Result<()> {
        let name = name.into();
        let entity = Entity::new(name.as_str(), raw, Arc::clone(&self.catalog))?;
        self.entities.insert(name, entity);
        Ok(())
    }

    /// Remove an entity, returning it
    pub fn remove(&mut self, name: &str) -> Option<Entity> {
        self.entities.shift_remove(name)
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if there are no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The raw record of every entity
    pub fn to_json(&self) -> Json {
        let record: Map<String, Json> = self
            .entities
            .iter()
            .map(|(name, entity)| (name.clone(), entity.to_json()))
            .collect();
        Json::Object(record)
    }
}

/// Spawned units, also serving as the unit lookup for towers
pub struct UnitManager {
    units: EntityManager,
}

impl UnitManager {
    /// Create a unit manager backed by `store`
    pub fn new(store: Arc<Store>) -> Result<Self> {
        Ok(Self {
            units: EntityManager::new(UNITS_KEY, store, unit_catalog(), BUILTIN_UNITS)?,
        })
    }

    /// The unit entities
    pub fn entities(&self) -> &EntityManager {
        &self.units
    }

    /// Mutable access to the unit entities
    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.units
    }
}

impl UnitSource for UnitManager {
    fn unit_value(&self, unit: &str, field: &str, buffs: &BuffState) -> Option<Value> {
        let skin = self.units.get(unit)?.default_skin()?;
        skin.value(0, field, &EvalContext::new(buffs))
    }
}

/// Towers together with the units they spawn
pub struct TowerManager {
    towers: EntityManager,
    units: UnitManager,
}

impl TowerManager {
    /// Create tower and unit managers backed by `store`
    pub fn new(store: Arc<Store>) -> Result<Self> {
        let units = UnitManager::new(Arc::clone(&store))?;
        let towers = EntityManager::new(TOWERS_KEY, store, tower_catalog(), BUILTIN_TOWERS)?;
        Ok(Self { towers, units })
    }

    /// The tower entities
    pub fn entities(&self) -> &EntityManager {
        &self.towers
    }

    /// Mutable access to the tower entities
    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.towers
    }

    /// The companion unit manager
    pub fn units(&self) -> &UnitManager {
        &self.units
    }

    /// Mutable access to the companion unit manager
    pub fn units_mut(&mut self) -> &mut UnitManager {
        &mut self.units
    }

    /// Evaluation context for tower reads under `buffs`
    pub fn eval_context<'a>(&'a self, buffs: &'a BuffState) -> EvalContext<'a> {
        EvalContext::new(buffs).with_units(&self.units)
    }

    /// Read one derived or stored value of a tower skin
    pub fn value(
        &self,
        tower: &str,
        skin: &str,
        level: usize,
        field: &str,
        buffs: &BuffState,
    ) -> Result<Option<Value>> {
        let skin = self.towers.skin(tower, skin)?;
        Ok(skin.value(level, field, &self.eval_context(buffs)))
    }

    /// Formatted table of a tower skin
    pub fn table(&self, tower: &str, skin: &str, buffs: &BuffState) -> Result<Vec<Vec<String>>> {
        let skin = self.towers.skin(tower, skin)?;
        Ok(skin.table(&self.eval_context(buffs)))
    }

    /// Formatted CSV of a tower skin
    pub fn csv(&self, tower: &str, skin: &str, buffs: &BuffState) -> Result<String> {
        let skin = self.towers.skin(tower, skin)?;
        Ok(skin.csv(&self.eval_context(buffs)))
    }

    /// Persist towers and units
    pub fn save(&mut self) -> Result<()> {
        self.units.units.save()?;
        self.towers.save()
    }

    /// Reload towers and units from the store
    pub fn reload(&mut self) -> Result<()> {
        self.units.units.reload()?;
        self.towers.reload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> Arc<Store> {
        Arc::new(Store::in_memory().unwrap())
    }

    fn number(value: Option<Value>) -> f64 {
        value.and_then(|v| v.as_float()).unwrap()
    }

    #[test]
    fn test_builtin_data_loads() {
        let manager = TowerManager::new(store()).unwrap();
        assert_eq!(manager.entities().source(), Source::Builtin);
        assert!(manager.entities().names().any(|n| n == "Scout"));
        assert!(manager.units().entities().get("Humvee").is_some());

        let elementalist = manager.entities().get("Elementalist").unwrap();
        assert_eq!(
            elementalist.skin_names().collect::<Vec<_>>(),
            vec!["Default", "Frost"]
        );
    }

    #[test]
    fn test_tower_reads_unit_dps() {
        let manager = TowerManager::new(store()).unwrap();
        let buffs = BuffState::none();

        // level 1 switches the spawned unit to the humvee
        let humvee = number(manager.units().unit_value("Humvee", "TotalDPS", &buffs));
        let unit_dps = number(
            manager
                .value("Military Base", "Default", 1, "UnitDPS", &buffs)
                .unwrap(),
        );
        assert_eq!(unit_dps, humvee);

        let soldier = number(manager.units().unit_value("Soldier", "TotalDPS", &buffs));
        let unit_dps = number(
            manager
                .value("Military Base", "Default", 0, "UnitDPS", &buffs)
                .unwrap(),
        );
        assert_eq!(unit_dps, soldier);

        // unit buffs flow through the lookup
        let mut buffed = BuffState::none();
        buffed.units.damage = 1.0;
        let doubled = number(
            manager
                .value("Military Base", "Default", 0, "UnitDPS", &buffed)
                .unwrap(),
        );
        assert!((doubled - 2.0 * soldier).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_unit_is_none() {
        let manager = TowerManager::new(store()).unwrap();
        let buffs = BuffState::none();
        assert!(manager.units().unit_value("Tank", "TotalDPS", &buffs).is_none());
        assert!(manager.units().unit_value("Humvee", "Nothing", &buffs).is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let store = store();
        let mut manager = TowerManager::new(Arc::clone(&store)).unwrap();
        manager
            .entities_mut()
            .skin_mut("Scout", "Default")
            .unwrap()
            .set(0, "Damage", 5)
            .unwrap();
        manager.save().unwrap();
        assert!(store.has_document(TOWERS_KEY).unwrap());
        assert!(store.has_document(UNITS_KEY).unwrap());

        let reopened = TowerManager::new(Arc::clone(&store)).unwrap();
        assert_eq!(reopened.entities().source(), Source::Store);
        let buffs = BuffState::none();
        assert_eq!(
            reopened.value("Scout", "Default", 0, "Damage", &buffs).unwrap(),
            Some(Value::Float(5.0))
        );
        assert_eq!(
            reopened.entities().to_json(),
            manager.entities().to_json()
        );
    }

    #[test]
    fn test_reload_discards_edits_and_reset_restores_builtin() {
        let store = store();
        let mut towers = EntityManager::new(
            TOWERS_KEY,
            Arc::clone(&store),
            tower_catalog(),
            BUILTIN_TOWERS,
        )
        .unwrap();
        let builtin = towers.to_json();

        towers.remove("Scout");
        towers.reload().unwrap();
        assert!(towers.get("Scout").is_some());

        towers.remove("Scout");
        towers.save().unwrap();
        towers.reload().unwrap();
        assert!(towers.get("Scout").is_none());

        towers.reset().unwrap();
        assert_eq!(towers.source(), Source::Builtin);
        assert!(!store.has_document(TOWERS_KEY).unwrap());
        assert_eq!(towers.to_json(), builtin);
    }

    #[test]
    fn test_insert_and_lookup_errors() {
        let mut towers =
            EntityManager::new(TOWERS_KEY, store(), tower_catalog(), BUILTIN_TOWERS).unwrap();
        let before = towers.len();

        let sniper = json!({
            "Default": { "Defaults": { "Damage": 6, "Cooldown": 3, "Price": 350 } },
        });
        towers.insert("Sniper", sniper).unwrap();
        assert_eq!(towers.len(), before + 1);
        assert_eq!(towers.names().last(), Some("Sniper"));

        assert!(matches!(
            towers.insert("Broken", json!({ "Default": { "Upgrades": 1 } })),
            Err(Error::Core(_))
        ));
        assert!(matches!(towers.skin("Nope", "Default"), Err(Error::NotFound(_))));
        assert!(matches!(
            towers.skin("Sniper", "Golden"),
            Err(Error::Core(towerlab_core::Error::SkinNotFound(_)))
        ));
    }

    #[test]
    fn test_corrupt_store_keeps_state() {
        let store = store();
        let mut towers = EntityManager::new(
            TOWERS_KEY,
            Arc::clone(&store),
            tower_catalog(),
            BUILTIN_TOWERS,
        )
        .unwrap();
        let before = towers.to_json();

        store
            .save_document(TOWERS_KEY, &json!({ "Scout": { "Default": { "Upgrades": "x" } } }))
            .unwrap();
        assert!(towers.reload().is_err());
        assert_eq!(towers.to_json(), before);
        assert_eq!(towers.source(), Source::Builtin);
    }
}
