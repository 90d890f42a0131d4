//! Combat buff configuration
//!
//! Buffs are owned by the editor's settings, not by the engine. Formulas
//! receive the active [`BuffState`] through the evaluation context on every
//! read, so changing a buff changes every derived number without a rebuild.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Multipliers and offsets applied to one role (towers or units)
///
/// Multiplicative buffs are fractions: `0.25` means +25%.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleBuffs {
    /// Seconds added to every cooldown to model the rate-of-fire bug
    pub rate_of_fire_bug: f64,
    /// Flat seconds added to every cooldown
    pub extra_cooldown: f64,
    /// Fire-rate buff
    pub firerate: f64,
    /// Damage buff
    pub damage: f64,
    /// Range buff
    pub range: f64,
    /// Placement and upgrade discount
    pub discount: f64,
    /// Health buff
    pub health: f64,
    /// Spawn-rate buff
    pub spawnrate: f64,
}

/// Buffs for both roles
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffState {
    pub towers: RoleBuffs,
    pub units: RoleBuffs,
}

impl BuffState {
    /// No buffs at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse a buff state from RON text
    ///
    /// # Example
    ///
    /// ```
    /// use towerlab_core::BuffState;
    ///
    /// let buffs = BuffState::from_ron("(towers: (damage: 0.1))").unwrap();
    /// assert_eq!(buffs.towers.damage, 0.1);
    /// assert_eq!(buffs.units.damage, 0.0);
    /// ```
    pub fn from_ron(content: &str) -> Result<Self> {
        ron::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Serialize to pretty RON text
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Config(e.to_string()))
    }
}
