//! Raw stat blocks and their flattened attribute views
//!
//! A [`Defaults`] wraps the level 0 block of a skin, an [`Upgrade`] wraps one
//! entry of its `Upgrades` array. Both expose a flat [`ValueMap`] built while
//! walking the raw JSON, registering every attribute with the skin's
//! [`Locator`] so later writes land back in the right container.

use crate::locator::{is_detection_flag, Location, Locator, ATTRIBUTES, DETECTIONS, DETECTION_FLAGS};
use crate::{Value, ValueMap};
use serde_json::{Map, Value as Json};

/// Attributes registered at the top level before anything else
pub const CANONICAL_ATTRIBUTES: [&str; 3] = ["Damage", "Cooldown", "Range"];
/// Logical name of the purchase cost attribute
pub const COST: &str = "Cost";
/// Legacy level 0 spelling of [`COST`]
pub const PRICE: &str = "Price";
/// Key holding an upgrade's stat delta
pub const STATS: &str = "Stats";

/// Which lifecycle a stat block belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Level 0 base block
    Defaults,
    /// Delta block of one upgrade
    Upgrade,
}

/// Common surface of [`Defaults`] and [`Upgrade`]
pub trait StatBlock {
    /// Flattened attributes of this block
    fn attributes(&self) -> &ValueMap;

    /// Write `value` into the raw block; returns `false` if it cannot be placed
    fn set(&mut self, name: &str, value: Value, locator: &Locator) -> bool;

    /// Remove `name` from the raw block; returns `true` if something was removed
    fn remove(&mut self, name: &str, locator: &Locator) -> bool;

    /// The raw JSON this block was built from, including any writes
    fn to_raw(&self) -> Json;

    /// Attribute names in discovery order
    fn attribute_names(&self) -> Vec<&str> {
        self.attributes().keys().map(String::as_str).collect()
    }

    /// Get one flattened attribute
    fn get(&self, name: &str) -> Option<&Value> {
        self.attributes().get(name)
    }
}

/// One raw stat block plus its flattened attributes
#[derive(Debug, Clone)]
pub struct BaseStats {
    kind: BlockKind,
    data: Json,
    attributes: ValueMap,
}

impl BaseStats {
    /// Wrap `data`, registering its attributes with `locator`
    ///
    /// Non-object data is treated as an empty block.
    pub fn new(data: Json, kind: BlockKind, locator: &mut Locator) -> Self {
        let data = if data.is_object() {
            data
        } else {
            Json::Object(Map::new())
        };
        let mut stats = Self {
            kind,
            data,
            attributes: ValueMap::new(),
        };
        stats.register(locator);
        stats
    }

    fn register(&mut self, locator: &mut Locator) {
        for name in CANONICAL_ATTRIBUTES {
            locator.add_location(name, Location::top());
            self.add_attribute(name, Some(Location::top()), locator);
        }

        if self.kind == BlockKind::Defaults {
            if let Some(cost) = self.read_cost() {
                locator.add_location(COST, Location::top());
                self.attributes.insert(COST.to_string(), cost);
            }
        }

        let top_keys: Vec<String> = self
            .data
            .as_object()
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default();
        for key in top_keys {
            if matches!(key.as_str(), ATTRIBUTES | DETECTIONS | COST | PRICE)
                || self.attributes.contains_key(&key)
            {
                continue;
            }
            self.add_attribute(&key, Some(Location::top()), locator);
        }

        let nested_keys: Vec<String> = Locator::target(&self.data, &Location::attributes())
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default();
        for key in nested_keys {
            if self.attributes.contains_key(&key) {
                continue;
            }
            self.add_attribute(&key, Some(Location::attributes()), locator);
        }

        for flag in DETECTION_FLAGS {
            locator.add_detection(flag);
            let present = self.detection(flag);
            self.attributes.insert(flag.to_string(), Value::Bool(present));
        }
    }

    /// Register `name` and append its value to the flattened map
    ///
    /// A name already known to the locator is read from its recorded
    /// location; otherwise from `location` (top level when `None`). Does
    /// nothing when the value is missing or not a scalar.
    pub fn add_attribute(&mut self, name: &str, location: Option<Location>, locator: &mut Locator) {
        let location = locator
            .get_location(name)
            .cloned()
            .or(location)
            .unwrap_or_default();
        let Some(raw) = Locator::locate(&self.data, name, &location) else {
            return;
        };
        let Some(value) = Value::from_json(raw) else {
            return;
        };
        if matches!(value, Value::List(_)) {
            return;
        }
        locator.add_location(name, location);
        self.attributes.insert(name.to_string(), value);
    }

    /// Which lifecycle this block belongs to
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// The raw block
    pub fn data(&self) -> &Json {
        &self.data
    }

    /// Flattened attributes
    pub fn attributes(&self) -> &ValueMap {
        &self.attributes
    }

    /// Ensure the containers of `location` exist, creating empty objects
    ///
    /// Returns `false` if a non-object value is in the way.
    pub fn ensure_location(&mut self, location: &Location) -> bool {
        let mut current = &mut self.data;
        for key in location.path() {
            let Some(obj) = current.as_object_mut() else {
                return false;
            };
            current = obj
                .entry(key.clone())
                .or_insert_with(|| Json::Object(Map::new()));
        }
        current.is_object()
    }

    pub(crate) fn insert_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    fn read_cost(&self) -> Option<Value> {
        let obj = self.data.as_object()?;
        obj.get(COST)
            .and_then(Value::from_json)
            .or_else(|| obj.get(PRICE).and_then(Value::from_json))
    }

    fn detection(&self, flag: &str) -> bool {
        Locator::locate(&self.data, flag, &Location::detections())
            .and_then(Json::as_bool)
            .unwrap_or(false)
    }

    fn set_detection(&mut self, flag: &str, on: bool) {
        let Some(obj) = self.data.as_object_mut() else {
            return;
        };
        if on {
            let container = obj
                .entry(DETECTIONS)
                .or_insert_with(|| Json::Object(Map::new()));
            if !container.is_object() {
                *container = Json::Object(Map::new());
            }
            if let Some(flags) = container.as_object_mut() {
                flags.insert(flag.to_string(), Json::Bool(true));
            }
        } else {
            let now_empty = match obj.get_mut(DETECTIONS).and_then(Json::as_object_mut) {
                Some(flags) => {
                    flags.shift_remove(flag);
                    flags.is_empty()
                }
                None => false,
            };
            if now_empty {
                obj.shift_remove(DETECTIONS);
            }
        }
        self.attributes.insert(flag.to_string(), Value::Bool(on));
    }

    fn set_level_zero_cost(&mut self, value: Value) -> bool {
        let Some(obj) = self.data.as_object_mut() else {
            return false;
        };
        // Legacy `Price` is read but never written back.
        if obj.contains_key(PRICE) && !obj.contains_key(COST) {
            let renamed: Map<String, Json> = std::mem::take(obj)
                .into_iter()
                .map(|(k, v)| {
                    if k == PRICE {
                        (COST.to_string(), value.to_json())
                    } else {
                        (k, v)
                    }
                })
                .collect();
            *obj = renamed;
        } else {
            obj.shift_remove(PRICE);
            obj.insert(COST.to_string(), value.to_json());
        }
        self.attributes.insert(COST.to_string(), value);
        true
    }

    /// Write `value` for `name` into the raw block
    ///
    /// Detection flags toggle membership in `Detections`; located attributes
    /// are written to their recorded container; `Cost` at level 0 is written
    /// under `Cost` even if the block used `Price`. Anything else fails.
    pub fn set(&mut self, name: &str, value: Value, locator: &Locator) -> bool {
        if is_detection_flag(name) || locator.has_detection(name) {
            let on = value.as_bool().unwrap_or_else(|| value.as_float().is_some_and(|f| f != 0.0));
            self.set_detection(name, on);
            return true;
        }

        if name == COST && self.kind == BlockKind::Defaults {
            return self.set_level_zero_cost(value);
        }

        let Some(location) = locator.get_location(name) else {
            return false;
        };
        let Some(target) = Locator::get_target_data(&mut self.data, location) else {
            return false;
        };
        target.insert(name.to_string(), value.to_json());
        self.attributes.insert(name.to_string(), value);
        true
    }

    /// Remove `name` from the raw block at its recorded location
    pub fn remove(&mut self, name: &str, locator: &Locator) -> bool {
        if is_detection_flag(name) {
            let had = self.detection(name);
            self.set_detection(name, false);
            return had;
        }

        let removed = if name == COST && self.kind == BlockKind::Defaults {
            self.data
                .as_object_mut()
                .map(|obj| obj.shift_remove(COST).is_some() | obj.shift_remove(PRICE).is_some())
                .unwrap_or(false)
        } else {
            let Some(location) = locator.get_location(name) else {
                return false;
            };
            Locator::get_target_data(&mut self.data, location)
                .map(|target| target.shift_remove(name).is_some())
                .unwrap_or(false)
        };
        self.attributes.shift_remove(name);
        removed
    }
}

/// The level 0 block of a skin
#[derive(Debug, Clone)]
pub struct Defaults {
    stats: BaseStats,
}

impl Defaults {
    /// Build from a skin's `Defaults` object
    pub fn new(data: Json, locator: &mut Locator) -> Self {
        Self {
            stats: BaseStats::new(data, BlockKind::Defaults, locator),
        }
    }

    /// The wrapped stat block
    pub fn stats(&self) -> &BaseStats {
        &self.stats
    }

    /// Ensure the containers of `location` exist in the defaults block
    pub fn ensure_location(&mut self, location: &Location) -> bool {
        self.stats.ensure_location(location)
    }
}

impl StatBlock for Defaults {
    fn attributes(&self) -> &ValueMap {
        self.stats.attributes()
    }

    fn set(&mut self, name: &str, value: Value, locator: &Locator) -> bool {
        self.stats.set(name, value, locator)
    }

    fn remove(&mut self, name: &str, locator: &Locator) -> bool {
        self.stats.remove(name, locator)
    }

    fn to_raw(&self) -> Json {
        self.stats.data.clone()
    }
}

/// One step of a skin's upgrade ladder
#[derive(Debug, Clone)]
pub struct Upgrade {
    stats: BaseStats,
    upgrade_data: Map<String, Json>,
}

impl Upgrade {
    /// Build from one entry of a skin's `Upgrades` array
    pub fn new(upgrade: Json, locator: &mut Locator) -> Self {
        let upgrade_data = match upgrade {
            Json::Object(map) => map,
            _ => Map::new(),
        };
        let stats_data = upgrade_data.get(STATS).cloned().unwrap_or(Json::Null);
        let mut stats = BaseStats::new(stats_data, BlockKind::Upgrade, locator);
        if let Some(cost) = upgrade_data.get(COST).and_then(Value::from_json) {
            locator.add_location(COST, Location::top());
            stats.insert_attribute(COST, cost);
        }
        Self {
            stats,
            upgrade_data,
        }
    }

    /// The wrapped `Stats` block
    pub fn stats(&self) -> &BaseStats {
        &self.stats
    }

    /// The whole upgrade record, metadata included
    pub fn upgrade_data(&self) -> &Map<String, Json> {
        &self.upgrade_data
    }

    /// Purchase cost of this upgrade
    pub fn cost(&self) -> Option<&Value> {
        self.stats.attributes().get(COST)
    }

    /// Upgrade title
    pub fn title(&self) -> Option<&str> {
        self.upgrade_data.get("Title").and_then(Json::as_str)
    }

    /// Upgrade image reference
    pub fn image(&self) -> Option<&str> {
        self.upgrade_data.get("Image").and_then(Json::as_str)
    }

    /// Ensure the containers of `location` exist in the `Stats` block
    pub fn ensure_location(&mut self, location: &Location) -> bool {
        self.stats.ensure_location(location)
    }

    /// Free-form ability lines
    pub fn extras(&self) -> Vec<&str> {
        self.upgrade_data
            .get(STATS)
            .and_then(|s| s.get("Extras"))
            .or_else(|| self.upgrade_data.get("Extras"))
            .and_then(Json::as_array)
            .map(|items| items.iter().filter_map(Json::as_str).collect())
            .unwrap_or_default()
    }
}

impl StatBlock for Upgrade {
    fn attributes(&self) -> &ValueMap {
        self.stats.attributes()
    }

    fn set(&mut self, name: &str, value: Value, locator: &Locator) -> bool {
        if name == COST {
            self.upgrade_data.insert(COST.to_string(), value.to_json());
            self.stats.insert_attribute(COST, value);
            return true;
        }
        if name == "Extras" {
            let stats = self
                .stats
                .data
                .as_object_mut()
                .map(|obj| obj.insert("Extras".to_string(), value.to_json()));
            return stats.is_some();
        }
        if self.stats.set(name, value.clone(), locator) {
            return true;
        }
        if name != STATS && self.upgrade_data.contains_key(name) {
            self.upgrade_data.insert(name.to_string(), value.to_json());
            return true;
        }
        false
    }

    fn remove(&mut self, name: &str, locator: &Locator) -> bool {
        if name == COST {
            self.stats.attributes.shift_remove(COST);
            return self.upgrade_data.shift_remove(COST).is_some();
        }
        self.stats.remove(name, locator)
    }

    fn to_raw(&self) -> Json {
        let mut raw = self.upgrade_data.clone();
        let stats_empty = self.stats.data.as_object().map_or(true, Map::is_empty);
        if raw.contains_key(STATS) || !stats_empty {
            raw.insert(STATS.to_string(), self.stats.data.clone());
        }
        Json::Object(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_flattening() {
        let mut locator = Locator::new();
        let defaults = Defaults::new(
            json!({
                "Damage": 50,
                "Cooldown": 2,
                "Range": 10,
                "Price": 300,
                "Attributes": { "Limit": 8 },
                "Detections": { "Hidden": true },
            }),
            &mut locator,
        );

        assert_eq!(defaults.get("Damage"), Some(&Value::Int(50)));
        assert_eq!(defaults.get("Cost"), Some(&Value::Int(300)));
        assert_eq!(defaults.get("Price"), None);
        assert_eq!(defaults.get("Limit"), Some(&Value::Int(8)));
        assert_eq!(defaults.get("Hidden"), Some(&Value::Bool(true)));
        assert_eq!(defaults.get("Flying"), Some(&Value::Bool(false)));
        assert_eq!(locator.get_location("Limit"), Some(&Location::attributes()));
        assert!(locator.has_detection("Lead"));

        // every visible attribute except detection flags is located
        for name in defaults.attribute_names() {
            assert!(locator.has_location(name) || locator.has_detection(name), "{name}");
        }
    }

    #[test]
    fn test_zero_is_a_value() {
        let mut locator = Locator::new();
        let defaults = Defaults::new(json!({ "Damage": 0, "Cooldown": 1 }), &mut locator);
        assert_eq!(defaults.get("Damage"), Some(&Value::Int(0)));
        assert_eq!(defaults.get("Range"), None);
    }

    #[test]
    fn test_detection_round_trip() {
        let mut locator = Locator::new();
        let mut defaults = Defaults::new(json!({ "Damage": 1 }), &mut locator);

        assert!(defaults.set("Hidden", true.into(), &locator));
        assert_eq!(defaults.to_raw()["Detections"], json!({ "Hidden": true }));

        assert!(defaults.set("Hidden", false.into(), &locator));
        assert!(defaults.to_raw().get("Detections").is_none());
        assert_eq!(defaults.get("Hidden"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_upgrade_detection_round_trip() {
        let mut locator = Locator::new();
        let mut upgrade =
            Upgrade::new(json!({ "Cost": 100, "Stats": { "Damage": 2 } }), &mut locator);
        assert_eq!(upgrade.get("Hidden"), Some(&Value::Bool(false)));

        assert!(upgrade.set("Hidden", true.into(), &locator));
        assert_eq!(upgrade.to_raw()["Stats"]["Detections"], json!({ "Hidden": true }));
        assert_eq!(upgrade.get("Hidden"), Some(&Value::Bool(true)));

        assert!(upgrade.set("Hidden", false.into(), &locator));
        assert!(upgrade.to_raw()["Stats"].get("Detections").is_none());
        assert_eq!(upgrade.get("Hidden"), Some(&Value::Bool(false)));

        assert!(!upgrade.remove("Hidden", &locator));
        assert_eq!(upgrade.get("Hidden"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_canonical_attributes_always_located() {
        let mut locator = Locator::new();
        let mut defaults = Defaults::new(json!({ "Price": 250 }), &mut locator);
        assert_eq!(defaults.get("Range"), None);
        for name in CANONICAL_ATTRIBUTES {
            assert_eq!(locator.get_location(name), Some(&Location::top()), "{name}");
        }

        assert!(defaults.set("Range", 10.into(), &locator));
        assert_eq!(defaults.to_raw(), json!({ "Price": 250, "Range": 10 }));
    }

    #[test]
    fn test_upgrade_creates_missing_container() {
        let mut locator = Locator::new();
        Defaults::new(json!({ "Attributes": { "Limit": 8 } }), &mut locator);
        let mut upgrade =
            Upgrade::new(json!({ "Cost": 100, "Stats": { "Damage": 2 } }), &mut locator);

        assert!(!upgrade.set("Limit", 4.into(), &locator));
        assert!(upgrade.ensure_location(&Location::attributes()));
        assert!(upgrade.set("Limit", 4.into(), &locator));
        assert_eq!(upgrade.to_raw()["Stats"], json!({ "Damage": 2, "Attributes": { "Limit": 4 } }));
    }

    #[test]
    fn test_detection_keeps_other_flags() {
        let mut locator = Locator::new();
        let mut defaults = Defaults::new(
            json!({ "Detections": { "Hidden": true, "Lead": true } }),
            &mut locator,
        );
        assert!(defaults.set("Hidden", false.into(), &locator));
        assert_eq!(defaults.to_raw()["Detections"], json!({ "Lead": true }));
    }

    #[test]
    fn test_set_located_attribute() {
        let mut locator = Locator::new();
        let mut defaults = Defaults::new(
            json!({ "Damage": 1, "Attributes": { "Limit": 8 } }),
            &mut locator,
        );

        assert!(defaults.set("Limit", 10.into(), &locator));
        assert_eq!(defaults.to_raw()["Attributes"]["Limit"], json!(10));
        assert!(defaults.to_raw().get("Limit").is_none());

        assert!(!defaults.set("Unknown", 1.into(), &locator));
    }

    #[test]
    fn test_price_is_written_as_cost() {
        let mut locator = Locator::new();
        let mut defaults = Defaults::new(json!({ "Price": 300, "Damage": 1 }), &mut locator);

        assert!(defaults.set("Cost", 350.into(), &locator));
        let raw = defaults.to_raw();
        assert_eq!(raw, json!({ "Cost": 350, "Damage": 1 }));
        assert_eq!(
            raw.as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["Cost", "Damage"]
        );
    }

    #[test]
    fn test_upgrade() {
        let mut locator = Locator::new();
        let mut upgrade = Upgrade::new(
            json!({
                "Title": "Sharper Arrows",
                "Cost": 100,
                "Stats": {
                    "Damage": 70,
                    "Detections": { "Hidden": true, "Flying": false },
                    "Extras": ["Pierce +1"],
                },
            }),
            &mut locator,
        );

        assert_eq!(upgrade.cost(), Some(&Value::Int(100)));
        assert_eq!(upgrade.get("Damage"), Some(&Value::Int(70)));
        assert_eq!(upgrade.get("Hidden"), Some(&Value::Bool(true)));
        assert_eq!(upgrade.get("Flying"), Some(&Value::Bool(false)));
        assert_eq!(upgrade.get("Lead"), Some(&Value::Bool(false)));
        assert_eq!(upgrade.get("Cooldown"), None);
        assert_eq!(upgrade.title(), Some("Sharper Arrows"));
        assert_eq!(upgrade.extras(), vec!["Pierce +1"]);

        assert!(upgrade.set("Cost", 125.into(), &locator));
        assert!(upgrade.set("Title", "Keen Arrows".into(), &locator));
        assert!(upgrade.set("Damage", 75.into(), &locator));
        let raw = upgrade.to_raw();
        assert_eq!(raw["Cost"], json!(125));
        assert_eq!(raw["Title"], json!("Keen Arrows"));
        assert_eq!(raw["Stats"]["Damage"], json!(75));
    }
}
