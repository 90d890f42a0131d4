//! One named variant of an entity and everything derived from it
//!
//! A [`SkinData`] owns the raw `{ Defaults, Upgrades }` record of a skin. All
//! derived state (locator, stat blocks, ladder, attached fields) is produced
//! by [`recompute`] and replaced wholesale after every edit; there is no
//! incremental update path.

use crate::base_stats::{Defaults, StatBlock, Upgrade, COST, STATS};
use crate::context::{EvalContext, Subject};
use crate::level::Levels;
use crate::locator::{is_detection_flag, Location, Locator};
use crate::rules::Catalog;
use crate::{Error, Result, Value};
use serde_json::{json, Map, Value as Json};
use std::sync::Arc;

/// Key of the level 0 block in a skin record
pub const DEFAULTS: &str = "Defaults";
/// Key of the upgrade array in a skin record
pub const UPGRADES: &str = "Upgrades";

/// State rebuilt from a raw skin record
#[derive(Debug, Clone)]
pub struct Derived {
    /// Attribute locations discovered across all blocks
    pub locator: Locator,
    /// Level 0 block
    pub defaults: Defaults,
    /// Upgrade blocks in ladder order
    pub upgrades: Vec<Upgrade>,
    /// The ladder with calculated fields attached
    pub levels: Levels,
}

/// Rebuild every derived structure of one skin from its raw record
///
/// Locator first, then the defaults block, each upgrade in order, the ladder,
/// and finally the calculated-field attachment pass.
pub fn recompute(
    entity: &str,
    skin: &str,
    raw: &Map<String, Json>,
    catalog: &Catalog,
) -> Result<Derived> {
    let mut locator = Locator::new();
    let defaults = Defaults::new(
        raw.get(DEFAULTS).cloned().unwrap_or(Json::Null),
        &mut locator,
    );

    let upgrades = match raw.get(UPGRADES) {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Array(items)) => items
            .iter()
            .map(|item| Upgrade::new(item.clone(), &mut locator))
            .collect(),
        Some(other) => {
            return Err(Error::InvalidShape(format!(
                "{entity}/{skin}: {UPGRADES} must be an array, got {other}"
            )))
        }
    };

    let mut blocks: Vec<&dyn StatBlock> = Vec::with_capacity(upgrades.len() + 1);
    blocks.push(&defaults);
    blocks.extend(upgrades.iter().map(|u| u as &dyn StatBlock));
    let mut levels = Levels::new(&blocks);

    let stored = levels.stored_attributes().clone();
    catalog.attach(&mut levels, &Subject::new(entity, skin, &stored));

    Ok(Derived {
        locator,
        defaults,
        upgrades,
        levels,
    })
}

/// One skin of a tower or unit
#[derive(Debug, Clone)]
pub struct SkinData {
    entity: String,
    name: String,
    raw: Map<String, Json>,
    catalog: Arc<Catalog>,
    derived: Derived,
}

impl SkinData {
    /// Build a skin from its raw record
    pub fn new(
        entity: impl Into<String>,
        name: impl Into<String>,
        raw: Json,
        catalog: Arc<Catalog>,
    ) -> Result<Self> {
        let entity = entity.into();
        let name = name.into();
        let Json::Object(raw) = raw else {
            return Err(Error::InvalidShape(format!(
                "{entity}/{name}: skin must be an object"
            )));
        };
        let derived = recompute(&entity, &name, &raw, &catalog)?;
        Ok(Self {
            entity,
            name,
            raw,
            catalog,
            derived,
        })
    }

    /// Rebuild all derived state from the raw record
    pub fn create_data(&mut self) -> Result<()> {
        self.derived = recompute(&self.entity, &self.name, &self.raw, &self.catalog)?;
        tracing::debug!(
            entity = %self.entity,
            skin = %self.name,
            levels = self.derived.levels.len(),
            "skin rebuilt"
        );
        Ok(())
    }

    /// Entity type name
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Skin name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw skin record, edits included
    pub fn raw(&self) -> &Map<String, Json> {
        &self.raw
    }

    /// The rule catalog attached on every rebuild
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Attribute locations of this skin
    pub fn locator(&self) -> &Locator {
        &self.derived.locator
    }

    /// The level 0 block
    pub fn defaults(&self) -> &Defaults {
        &self.derived.defaults
    }

    /// Upgrade blocks in ladder order
    pub fn upgrades(&self) -> &[Upgrade] {
        &self.derived.upgrades
    }

    /// The evaluated ladder
    pub fn levels(&self) -> &Levels {
        &self.derived.levels
    }

    /// Read `name` at `level`, evaluating calculated fields
    pub fn value(&self, level: usize, name: &str, ctx: &EvalContext<'_>) -> Option<Value> {
        self.derived.levels.value(level, name, ctx)
    }

    /// Formatted table of the ladder
    pub fn table(&self, ctx: &EvalContext<'_>) -> Vec<Vec<String>> {
        self.derived.levels.table(ctx)
    }

    /// Formatted ladder as CSV text
    pub fn csv(&self, ctx: &EvalContext<'_>) -> String {
        self.derived.levels.csv(ctx)
    }

    /// Write `value` for `attribute` at `level` and rebuild
    ///
    /// Level 0 writes go to the defaults block, level `n` to upgrade `n - 1`.
    /// Missing containers on a located attribute's path are created first.
    pub fn set(&mut self, level: usize, attribute: &str, value: impl Into<Value>) -> Result<()> {
        let len = self.derived.levels.len();
        if level >= len {
            return Err(Error::LevelOutOfRange { index: level, len });
        }

        let value = value.into();
        let Derived {
            locator,
            defaults,
            upgrades,
            ..
        } = &mut self.derived;
        if !is_detection_flag(attribute) && attribute != COST {
            if let Some(location) = locator.get_location(attribute) {
                if level == 0 {
                    defaults.ensure_location(location);
                } else {
                    upgrades[level - 1].ensure_location(location);
                }
            }
        }
        let written = if level == 0 {
            defaults.set(attribute, value, locator)
        } else {
            upgrades[level - 1].set(attribute, value, locator)
        };
        if !written {
            tracing::warn!(
                entity = %self.entity,
                skin = %self.name,
                attribute,
                level,
                "cannot locate attribute"
            );
            return Err(Error::Unlocatable {
                attribute: attribute.to_string(),
                level,
            });
        }

        self.sync_raw();
        self.create_data()
    }

    /// Add a new attribute to the defaults block at `location` and rebuild
    ///
    /// Missing containers along `location` are created. An attribute that is
    /// already located keeps its recorded location.
    pub fn add_attribute(
        &mut self,
        name: &str,
        location: Location,
        value: impl Into<Value>,
    ) -> Result<()> {
        let value = value.into();
        let Derived {
            locator, defaults, ..
        } = &mut self.derived;

        if !is_detection_flag(name) {
            let location = locator.get_location(name).cloned().unwrap_or(location);
            if !defaults.ensure_location(&location) {
                return Err(Error::InvalidShape(format!(
                    "{}/{}: cannot create {location} for {name}",
                    self.entity, self.name
                )));
            }
            locator.add_location(name, location);
        }
        if !defaults.set(name, value, locator) {
            return Err(Error::Unlocatable {
                attribute: name.to_string(),
                level: 0,
            });
        }

        self.sync_raw();
        self.create_data()
    }

    /// Remove `name` from every block and rebuild
    ///
    /// Returns `true` if any block stored it.
    pub fn remove_attribute(&mut self, name: &str) -> Result<bool> {
        let Derived {
            locator,
            defaults,
            upgrades,
            ..
        } = &mut self.derived;
        let mut removed = defaults.remove(name, locator);
        for upgrade in upgrades.iter_mut() {
            removed |= upgrade.remove(name, locator);
        }

        self.sync_raw();
        self.create_data()?;
        Ok(removed)
    }

    /// Append an empty upgrade and rebuild
    pub fn add_level(&mut self) -> Result<()> {
        let upgrades = self
            .raw
            .entry(UPGRADES)
            .or_insert_with(|| Json::Array(Vec::new()));
        let Some(items) = upgrades.as_array_mut() else {
            return Err(Error::InvalidShape(format!(
                "{}/{}: {UPGRADES} must be an array",
                self.entity, self.name
            )));
        };
        items.push(json!({ COST: 0, STATS: {} }));
        self.create_data()
    }

    /// Remove upgrade level `index` (1 or higher) and rebuild
    pub fn remove_level(&mut self, index: usize) -> Result<()> {
        let len = self.derived.levels.len();
        if index == 0 || index >= len {
            return Err(Error::LevelOutOfRange { index, len });
        }
        if let Some(items) = self.raw.get_mut(UPGRADES).and_then(Json::as_array_mut) {
            items.remove(index - 1);
        }
        self.create_data()
    }

    /// Copy the edited stat blocks back into the raw record
    fn sync_raw(&mut self) {
        self.raw
            .insert(DEFAULTS.to_string(), self.derived.defaults.to_raw());
        if self.derived.upgrades.is_empty() && !self.raw.contains_key(UPGRADES) {
            return;
        }
        let upgrades = self
            .derived
            .upgrades
            .iter()
            .map(StatBlock::to_raw)
            .collect();
        self.raw.insert(UPGRADES.to_string(), Json::Array(upgrades));
    }
}
