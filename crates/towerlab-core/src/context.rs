//! Evaluation and selection contexts

use crate::{BuffState, Value};
use indexmap::IndexSet;

/// Lookup of computed unit statistics for towers that spawn units
///
/// Implementors evaluate afresh on every call so the result always reflects
/// the unit's current data and the given buffs.
pub trait UnitSource {
    /// Resolve `field` for the unit named `unit`
    fn unit_value(&self, unit: &str, field: &str, buffs: &BuffState) -> Option<Value>;
}

/// Everything a formula may read besides the level itself
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// Active combat buffs
    pub buffs: &'a BuffState,
    /// Companion unit lookup, if any
    pub units: Option<&'a dyn UnitSource>,
}

impl<'a> EvalContext<'a> {
    /// Create a context without a unit lookup
    pub fn new(buffs: &'a BuffState) -> Self {
        Self { buffs, units: None }
    }

    /// Attach a unit lookup
    pub fn with_units(mut self, units: &'a dyn UnitSource) -> Self {
        self.units = Some(units);
        self
    }
}

/// The entity a rule catalog is resolved against
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    /// Entity type name (tower or unit name)
    pub entity: &'a str,
    /// Skin name
    pub skin: &'a str,
    /// Union of stored attribute names across the skin's levels
    pub attributes: &'a IndexSet<String>,
}

impl<'a> Subject<'a> {
    /// Create a subject
    pub fn new(entity: &'a str, skin: &'a str, attributes: &'a IndexSet<String>) -> Self {
        Self {
            entity,
            skin,
            attributes,
        }
    }

    /// Check if the skin stores `name` at any level
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }
}
